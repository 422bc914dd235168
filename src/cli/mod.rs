//! CLI 모듈
//!
//! palank-ask CLI 명령어 정의 및 구현

use std::io::Write;
use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use tokio::io::{AsyncBufReadExt, BufReader};

use crate::agent::{Provenance, QueryResult};
use crate::assistant::{open_index, Assistant, QueryMode};
use crate::collector::{direct_input, load_document, FileCollector};
use crate::config::{Config, OPENAI_API_KEY_VAR, SERPER_API_KEY_VAR};
use crate::knowledge::{DocumentIndex, IngestOutcome, NewDocument, SourceCatalog, CATALOG_FILE};
use crate::session::{ChatSession, Role};

// ============================================================================
// CLI Definition
// ============================================================================

#[derive(Parser)]
#[command(name = "palank-ask")]
#[command(version, about = "문서 + 웹 검색 하이브리드 질의응답", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

/// 답변 모드 인자
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ModeArg {
    Hybrid,
    Documents,
    Web,
}

impl ModeArg {
    fn into_mode(self, no_auto_route: bool) -> QueryMode {
        match self {
            Self::Hybrid => QueryMode::Hybrid {
                auto_route: !no_auto_route,
            },
            Self::Documents => QueryMode::Documents,
            Self::Web => QueryMode::Web,
        }
    }
}

#[derive(Subcommand)]
pub enum Commands {
    /// 파일, 폴더, 또는 텍스트를 문서 인덱스에 추가
    Ingest {
        /// 직접 입력할 텍스트 (출처: direct-input)
        #[arg(short, long)]
        text: Option<String>,

        /// 추가할 파일 경로 (.txt, .md)
        #[arg(long)]
        file: Option<PathBuf>,

        /// 추가할 폴더 경로 (재귀)
        #[arg(short, long)]
        dir: Option<PathBuf>,

        /// 내용이 같아도 다시 인덱싱
        #[arg(long)]
        force: bool,
    },

    /// 질문 하나에 답변
    Ask {
        /// 질문
        question: String,

        /// 답변 모드
        #[arg(short, long, value_enum, default_value_t = ModeArg::Hybrid)]
        mode: ModeArg,

        /// 하이브리드 모드에서 라우팅 없이 항상 융합
        #[arg(long)]
        no_auto_route: bool,

        /// 결과를 JSON으로 출력
        #[arg(long)]
        json: bool,
    },

    /// 대화형 세션
    Chat {
        /// 시작 모드
        #[arg(short, long, value_enum, default_value_t = ModeArg::Hybrid)]
        mode: ModeArg,

        /// 하이브리드 모드에서 라우팅 없이 항상 융합
        #[arg(long)]
        no_auto_route: bool,
    },

    /// 인덱싱된 출처 목록
    List,

    /// 출처 하나 삭제
    Delete {
        /// 삭제할 출처 이름 (파일 이름)
        source: String,
    },

    /// 인덱스 전체 삭제
    Clear {
        /// 확인 없이 삭제
        #[arg(long)]
        yes: bool,
    },

    /// 상태 확인
    Status,
}

// ============================================================================
// CLI Runner
// ============================================================================

/// CLI 명령어 실행
pub async fn run(cli: Cli) -> Result<()> {
    let config = Config::from_env();

    match cli.command {
        Commands::Ingest {
            text,
            file,
            dir,
            force,
        } => cmd_ingest(&config, text, file, dir, force).await,
        Commands::Ask {
            question,
            mode,
            no_auto_route,
            json,
        } => cmd_ask(&config, &question, mode.into_mode(no_auto_route), json).await,
        Commands::Chat {
            mode,
            no_auto_route,
        } => cmd_chat(&config, mode.into_mode(no_auto_route), !no_auto_route).await,
        Commands::List => cmd_list(&config),
        Commands::Delete { source } => cmd_delete(&config, &source).await,
        Commands::Clear { yes } => cmd_clear(&config, yes).await,
        Commands::Status => cmd_status(&config),
    }
}

// ============================================================================
// Command Implementations
// ============================================================================

/// 문서 수집 명령어 (ingest)
async fn cmd_ingest(
    config: &Config,
    text: Option<String>,
    file: Option<PathBuf>,
    dir: Option<PathBuf>,
    force: bool,
) -> Result<()> {
    let mut documents: Vec<NewDocument> = Vec::new();

    if let Some(ref text) = text {
        documents.push(direct_input(text));
    }

    if let Some(ref path) = file {
        documents.push(load_document(path).with_context(|| format!("파일 로드 실패: {:?}", path))?);
    }

    if let Some(ref path) = dir {
        println!("[*] 폴더 스캔 중: {}", path.display());
        let files = FileCollector::with_defaults()
            .collect_directory(path)
            .context("폴더 수집 실패")?;

        for collected in files {
            match collected.load() {
                Ok(doc) => documents.push(doc),
                Err(e) => println!("[!] 건너뜀: {} ({})", collected.path.display(), e),
            }
        }
    }

    if text.is_none() && file.is_none() && dir.is_none() {
        bail!("--text, --file, --dir 중 하나를 지정해야 합니다");
    }

    if documents.is_empty() {
        println!("[!] 추가할 문서가 없습니다.");
        return Ok(());
    }

    let index = open_index(config).await.context("문서 인덱스 열기 실패")?;

    let total = documents.len();
    let mut indexed = 0;
    let mut unchanged = 0;
    let mut failed = 0;

    for (i, doc) in documents.into_iter().enumerate() {
        let source = doc.source.clone();
        print!("[{}/{}] {} ... ", i + 1, total, source);
        std::io::stdout().flush().ok();

        match index.add_document(doc, force).await {
            Ok(IngestOutcome::Indexed { chunks }) => {
                println!("{} 청크", chunks);
                indexed += 1;
            }
            Ok(IngestOutcome::Unchanged) => {
                println!("변경 없음");
                unchanged += 1;
            }
            Ok(IngestOutcome::Empty) => {
                println!("빈 문서");
            }
            Err(e) => {
                println!("실패: {}", e);
                failed += 1;
            }
        }
    }

    println!();
    println!(
        "[OK] 완료: {} 인덱싱, {} 변경 없음, {} 실패",
        indexed, unchanged, failed
    );

    Ok(())
}

/// 질의 명령어 (ask)
async fn cmd_ask(config: &Config, question: &str, mode: QueryMode, json: bool) -> Result<()> {
    let assistant = Assistant::open(config)
        .await
        .context("Assistant 초기화 실패")?;

    let result = assistant.ask(question, mode).await.context("질의 실패")?;

    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(&result).context("JSON 직렬화 실패")?
        );
    } else {
        print_result(&result);
    }

    Ok(())
}

/// 대화 명령어 (chat)
///
/// `auto_route`는 세션 시작 시 플래그로 정해지며 `/mode` 전환 후에도 유지됩니다.
async fn cmd_chat(config: &Config, mut mode: QueryMode, auto_route: bool) -> Result<()> {
    let assistant = Assistant::open(config)
        .await
        .context("Assistant 초기화 실패")?;
    let mut session = ChatSession::new();

    println!("palank-ask chat (mode: {})", mode);
    println!("명령어: /mode <hybrid|documents|web>, /history, /clear, /quit");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        print!("\n> ");
        std::io::stdout().flush().ok();

        let Some(line) = lines.next_line().await.context("입력 읽기 실패")? else {
            break;
        };
        let input = line.trim();

        if input.is_empty() {
            continue;
        }

        if let Some(command) = input.strip_prefix('/') {
            match parse_chat_command(command) {
                ChatCommand::Quit => break,
                ChatCommand::Clear => {
                    session.clear();
                    println!("[OK] 대화 기록을 지웠습니다.");
                }
                ChatCommand::History => print_history(&session),
                ChatCommand::Mode(Some(label)) => {
                    if switch_mode(&mut mode, &label, auto_route) {
                        println!("[OK] 모드: {}", mode);
                    } else {
                        println!("[!] 알 수 없는 모드: {}", label);
                    }
                }
                ChatCommand::Mode(None) => println!("[*] 현재 모드: {}", mode),
                ChatCommand::Unknown(name) => println!("[!] 알 수 없는 명령어: /{}", name),
            }
            continue;
        }

        session.push_user(input);
        match assistant.ask(input, mode).await {
            Ok(result) => {
                print_result(&result);
                session.push_result(&result);
            }
            Err(e) => {
                println!("[!] {}", e);
                session.push_error(&e.to_string());
            }
        }
    }

    println!("[*] 종료합니다.");
    Ok(())
}

/// 목록 명령어 (list)
fn cmd_list(config: &Config) -> Result<()> {
    let catalog = SourceCatalog::open(&config.data_dir.join(CATALOG_FILE))
        .context("출처 카탈로그 열기 실패")?;

    let sources = catalog.list().context("출처 목록 조회 실패")?;

    if sources.is_empty() {
        println!("[!] 인덱싱된 문서가 없습니다.");
        return Ok(());
    }

    println!("[OK] 인덱싱된 출처 ({} 건):\n", sources.len());

    for source in sources {
        println!("  {} [{}]", truncate_text(&source.name, 60), source.file_type);
        println!(
            "        {} | {} 청크 | {}",
            source.created_at.format("%Y-%m-%d %H:%M"),
            source.chunk_count,
            format_bytes(source.content_bytes)
        );
    }

    Ok(())
}

/// 삭제 명령어 (delete)
async fn cmd_delete(config: &Config, source: &str) -> Result<()> {
    let index = open_index(config).await.context("문서 인덱스 열기 실패")?;

    let known = index.all_source_names().await.context("출처 목록 조회 실패")?;
    if !known.iter().any(|name| name == source) {
        bail!("출처 '{}'를 찾을 수 없습니다", source);
    }

    let deleted = index
        .delete_by_source(source)
        .await
        .context("출처 삭제 실패")?;

    println!("[OK] '{}' 삭제됨 ({} 청크)", source, deleted);
    Ok(())
}

/// 전체 삭제 명령어 (clear)
async fn cmd_clear(config: &Config, yes: bool) -> Result<()> {
    if !yes {
        bail!("모든 문서를 삭제하려면 --yes를 지정하세요");
    }

    let index = open_index(config).await.context("문서 인덱스 열기 실패")?;
    index.clear_all().await.context("인덱스 삭제 실패")?;

    println!("[OK] 모든 문서를 삭제했습니다.");
    Ok(())
}

/// 상태 명령어 (status)
fn cmd_status(config: &Config) -> Result<()> {
    println!("palank-ask v{}", env!("CARGO_PKG_VERSION"));
    println!();

    println!("[*] 데이터 디렉토리: {}", config.data_dir.display());
    println!("[*] 모델: {} / {}", config.llm_model, config.embedding_model);

    print_key_status(OPENAI_API_KEY_VAR, config.has_openai_key());
    print_key_status(SERPER_API_KEY_VAR, config.has_serper_key());

    match SourceCatalog::open(&config.data_dir.join(CATALOG_FILE)) {
        Ok(catalog) => match catalog.stats() {
            Ok(stats) => {
                println!("[OK] 인덱싱된 출처: {} 건", stats.source_count);
                println!("     청크: {} 개", stats.chunk_count);
                println!(
                    "     총 콘텐츠: {}",
                    format_bytes(stats.total_content_bytes)
                );
            }
            Err(e) => println!("[!] 통계 조회 실패: {}", e),
        },
        Err(e) => println!("[!] 출처 카탈로그 열기 실패: {}", e),
    }

    Ok(())
}

// ============================================================================
// Chat Commands
// ============================================================================

#[derive(Debug, PartialEq)]
enum ChatCommand {
    Quit,
    Clear,
    History,
    Mode(Option<String>),
    Unknown(String),
}

/// `/` 뒤의 명령어 해석
fn parse_chat_command(command: &str) -> ChatCommand {
    let mut parts = command.split_whitespace();
    let name = parts.next().unwrap_or("");

    match name {
        "quit" | "exit" | "q" => ChatCommand::Quit,
        "clear" => ChatCommand::Clear,
        "history" => ChatCommand::History,
        "mode" => ChatCommand::Mode(parts.next().map(str::to_string)),
        other => ChatCommand::Unknown(other.to_string()),
    }
}

/// `/mode <label>` 적용. 알 수 없는 이름이면 현재 모드 유지
fn switch_mode(mode: &mut QueryMode, label: &str, auto_route: bool) -> bool {
    match QueryMode::from_label(label, auto_route) {
        Some(new_mode) => {
            *mode = new_mode;
            true
        }
        None => false,
    }
}

// ============================================================================
// Helper Functions
// ============================================================================

fn print_key_status(name: &str, present: bool) {
    if present {
        println!("[OK] {}: 설정됨", name);
    } else {
        println!("[!] {}: 미설정", name);
        println!("    설정: export {}=your-key (또는 .env)", name);
    }
}

fn print_result(result: &QueryResult) {
    println!("\n[{}]\n", result.mode);
    println!("{}", result.answer.trim());

    if !result.sources.is_empty() {
        println!("\nSources:");
        for source in &result.sources {
            println!("  {}", render_provenance(source));
        }
    }
}

fn print_history(session: &ChatSession) {
    if session.is_empty() {
        println!("[!] 대화 기록이 없습니다.");
        return;
    }

    for turn in session.turns() {
        let who = match turn.role {
            Role::User => "you".to_string(),
            Role::Assistant => match turn.mode {
                Some(mode) => format!("assistant/{}", mode),
                None => "assistant".to_string(),
            },
        };
        println!("{:>20}: {}", who, truncate_text(&turn.content, 100));
    }
}

/// 출처 한 줄 표시
fn render_provenance(source: &Provenance) -> String {
    match source {
        Provenance::Document { name } => format!("[doc] {}", name),
        Provenance::Web { title, url } => match host_of(url) {
            Some(host) => format!("[web] {} ({}) {}", title, host, url),
            None => format!("[web] {} {}", title, url),
        },
    }
}

fn host_of(url: &str) -> Option<String> {
    url::Url::parse(url)
        .ok()
        .and_then(|u| u.host_str().map(|h| h.trim_start_matches("www.").to_string()))
}

/// 텍스트 자르기 (UTF-8 안전)
fn truncate_text(text: &str, max_chars: usize) -> String {
    let cleaned = text.replace('\n', " ").replace('\r', "");
    let cleaned = cleaned.trim();

    if cleaned.chars().count() <= max_chars {
        cleaned.to_string()
    } else {
        let truncated: String = cleaned.chars().take(max_chars).collect();
        format!("{}...", truncated)
    }
}

/// 바이트 크기 포맷팅
fn format_bytes(bytes: usize) -> String {
    const KB: usize = 1024;
    const MB: usize = KB * 1024;

    if bytes >= MB {
        format!("{:.2} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.2} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} B", bytes)
    }
}

// ============================================================================
// Tests
// ============================================================================
