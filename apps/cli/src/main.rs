use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, bail, Context, Result};
use chplus_core::{
    find_all, find_matching_bracket, normalize_punctuation, CaseTransform, CommentAction, Document,
    EditorSession, FoldOutcome, LineRange, Position, Selection,
};
use chplus_highlight::{
    find_node, insertion_text, library_catalog, CatalogNode, Highlighter, TokenSpan,
};
use chplus_runexec::{console_report, spawn};
use chplus_settings::PreferencesStore;
use clap::{Args, Parser, Subcommand, ValueEnum};
use serde::Serialize;
use tracing::debug;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "chplus-ide",
    about = "Editing utilities for CH+ scripts",
    author,
    version
)]
struct Cli {
    /// 工作區根目錄；預設為目前目錄。 / Workspace root (defaults to current directory).
    #[arg(long, global = true, value_name = "PATH")]
    workspace: Option<PathBuf>,
    /// 偏好設定檔路徑。 / Preferences file (defaults to `<workspace>/.chplus/chplus_ide.json`).
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,
    /// 顯示更多日誌（可重複）。 / More log output; repeat for trace level.
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// 語法高亮。 / Highlight a script.
    Highlight(HighlightArgs),
    /// 尋找配對括號。 / Find the bracket matching a cursor position.
    Brackets(BracketsArgs),
    /// 折疊區塊並列出可見行。 / Fold blocks and print the visible lines.
    Fold(FoldArgs),
    /// 行編輯操作。 / Apply a line transform.
    Edit(EditArgs),
    /// 中文標點轉為英文標點。 / Convert Chinese punctuation to ASCII.
    Normalize(NormalizeArgs),
    /// 尋找文字。 / Find text; with a cursor, only the next match (wrapping).
    Find(FindArgs),
    /// 全部取代。 / Replace every occurrence of a string.
    Replace(ReplaceArgs),
    /// 查詢關鍵字說明。 / Show documentation for a keyword or library entry.
    Doc(DocArgs),
    /// 列出函式庫目錄。 / Print the function library catalog.
    Catalog(CatalogArgs),
    /// 以直譯器執行腳本。 / Run a script with the CH+ interpreter.
    Run(RunArgs),
    /// 偏好設定管理。 / Inspect, import or export preferences.
    #[command(subcommand)]
    Settings(SettingsCommand),
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum HighlightFormat {
    Text,
    Json,
    Ansi,
}

#[derive(Args)]
struct HighlightArgs {
    input: PathBuf,
    #[arg(long, value_enum, default_value = "text")]
    format: HighlightFormat,
}

#[derive(Args)]
struct BracketsArgs {
    input: PathBuf,
    /// 行號（從 1 起算）。 / 1-based line.
    #[arg(long)]
    line: usize,
    /// 欄位（從 1 起算，游標在該字元之前）。 / 1-based column; the cursor sits before that character.
    #[arg(long)]
    column: usize,
}

#[derive(Args)]
struct FoldArgs {
    input: PathBuf,
    /// 依序切換的標頭行（從 1 起算）。 / Header lines to toggle, in order (1-based).
    #[arg(long = "line", required = true)]
    lines: Vec<usize>,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum EditOperation {
    Duplicate,
    Delete,
    MoveUp,
    MoveDown,
    ToggleComment,
    Upper,
    Lower,
    TrimTrailing,
    CollapseBlank,
}

#[derive(Args)]
struct EditArgs {
    #[arg(value_enum)]
    operation: EditOperation,
    input: PathBuf,
    /// 目標行，例如 `3` 或 `2-5`（從 1 起算）。 / Target lines such as `3` or `2-5` (1-based).
    #[arg(long, value_parser = parse_line_range)]
    lines: Option<LineRange>,
    #[command(flatten)]
    output: OutputArgs,
}

#[derive(Args)]
struct NormalizeArgs {
    input: PathBuf,
    /// 字串內的標點也轉換。 / Convert inside string literals too.
    #[arg(long)]
    include_strings: bool,
    #[command(flatten)]
    output: OutputArgs,
}

#[derive(Args)]
struct FindArgs {
    input: PathBuf,
    needle: String,
    /// 游標行（從 1 起算）。 / 1-based caret line.
    #[arg(long, requires = "column")]
    line: Option<usize>,
    /// 游標欄（從 1 起算）。 / 1-based caret column.
    #[arg(long, requires = "line")]
    column: Option<usize>,
}

#[derive(Args)]
struct ReplaceArgs {
    input: PathBuf,
    needle: String,
    replacement: String,
    #[command(flatten)]
    output: OutputArgs,
}

#[derive(Args)]
struct OutputArgs {
    /// 就地覆寫。 / Overwrite the input file.
    #[arg(long)]
    in_place: bool,
    /// 輸出檔案。 / Write the result to this file.
    #[arg(long, conflicts_with = "in_place")]
    output: Option<PathBuf>,
}

#[derive(Args)]
struct DocArgs {
    name: String,
}

#[derive(Args)]
struct CatalogArgs {
    /// 以 JSON 輸出。 / Emit JSON.
    #[arg(long)]
    json: bool,
    /// 只顯示此分類。 / Only show this category or entry.
    #[arg(long)]
    node: Option<String>,
}

#[derive(Args)]
struct RunArgs {
    script: PathBuf,
    /// 覆寫直譯器路徑。 / Interpreter override.
    #[arg(long)]
    interpreter: Option<PathBuf>,
    /// 不傳入 `-p`。 / Do not pass `-p`.
    #[arg(long)]
    no_pause: bool,
    #[arg(long, value_name = "MS")]
    timeout_ms: Option<u64>,
    /// 工作目錄；預設為腳本所在目錄。 / Working directory (defaults to the script's directory).
    #[arg(long, value_name = "DIR")]
    working_dir: Option<PathBuf>,
}

#[derive(Subcommand)]
enum SettingsCommand {
    /// 輸出目前設定。 / Print current preferences as JSON.
    Show,
    /// 匯出偏好設定。 / Export preferences.
    Export {
        #[arg(long)]
        output: PathBuf,
    },
    /// 匯入偏好設定 JSON。 / Import preferences from JSON.
    Import { input: PathBuf },
    /// 列出最近開啟的檔案。 / List recently run scripts.
    Recent,
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    if let Err(err) = run(cli) {
        eprintln!("Error: {err:#}");
        std::process::exit(1);
    }
}

fn init_tracing(verbose: u8) {
    let fallback = match verbose {
        0 => "warn",
        1 => "debug",
        _ => "trace",
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback)),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn run(cli: Cli) -> Result<()> {
    let Cli {
        workspace,
        config,
        command,
        ..
    } = cli;
    let prefs_path = match config {
        Some(path) => path,
        None => preferences_path(&resolve_workspace(workspace)?),
    };
    debug!(path = %prefs_path.display(), "using preferences file");

    match command {
        Commands::Highlight(args) => execute_highlight(args, &load_store(&prefs_path)?),
        Commands::Brackets(args) => execute_brackets(args),
        Commands::Fold(args) => execute_fold(args),
        Commands::Edit(args) => execute_edit(args),
        Commands::Normalize(args) => execute_normalize(args, &load_store(&prefs_path)?),
        Commands::Find(args) => execute_find(args),
        Commands::Replace(args) => execute_replace(args),
        Commands::Doc(args) => execute_doc(args, &load_store(&prefs_path)?),
        Commands::Catalog(args) => execute_catalog(args, &load_store(&prefs_path)?),
        Commands::Run(args) => execute_run(args, &mut load_store(&prefs_path)?),
        Commands::Settings(subcommand) => {
            execute_settings_command(subcommand, &mut load_store(&prefs_path)?)
        }
    }
}

fn resolve_workspace(workspace: Option<PathBuf>) -> Result<PathBuf> {
    match workspace {
        Some(path) => Ok(path),
        None => std::env::current_dir().context("failed to determine current directory"),
    }
}

fn preferences_path(workspace_root: &Path) -> PathBuf {
    workspace_root.join(".chplus").join("chplus_ide.json")
}

fn load_store(path: &Path) -> Result<PreferencesStore> {
    PreferencesStore::load(path)
        .with_context(|| format!("failed to load preferences from {}", path.display()))
}

fn read_document(path: &Path) -> Result<Document> {
    let text =
        fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))?;
    Ok(Document::from_text(&text))
}

fn write_result(input: &Path, output: &OutputArgs, text: &str) -> Result<()> {
    let target = if output.in_place {
        Some(input)
    } else {
        output.output.as_deref()
    };
    match target {
        Some(path) => {
            fs::write(path, text).with_context(|| format!("failed to write {}", path.display()))?;
            eprintln!("Wrote {}", path.display());
        }
        None => println!("{text}"),
    }
    Ok(())
}

#[derive(Serialize)]
struct HighlightedLine<'a> {
    line: usize,
    text: &'a str,
    spans: Vec<TokenSpan>,
}

fn execute_highlight(args: HighlightArgs, store: &PreferencesStore) -> Result<()> {
    let document = read_document(&args.input)?;
    let prefs = store.preferences();
    let highlighter = Highlighter::new(prefs.keyword_set());

    match args.format {
        HighlightFormat::Json => {
            let lines: Vec<HighlightedLine<'_>> = document
                .lines()
                .iter()
                .enumerate()
                .map(|(index, text)| HighlightedLine {
                    line: index + 1,
                    text,
                    spans: highlighter.highlight_line(text),
                })
                .collect();
            println!("{}", serde_json::to_string_pretty(&lines)?);
        }
        HighlightFormat::Ansi => {
            let palette = prefs.palette();
            for text in document.lines() {
                println!("{}", palette.render_ansi(text, &highlighter.segments(text)));
            }
        }
        HighlightFormat::Text => {
            for (index, text) in document.lines().iter().enumerate() {
                let chars: Vec<char> = text.chars().collect();
                for span in highlighter.highlight_line(text) {
                    let token: String = chars[span.range()].iter().collect();
                    println!(
                        "{}:{}\t{}\t{}",
                        index + 1,
                        span.start + 1,
                        span.kind,
                        token
                    );
                }
            }
        }
    }
    Ok(())
}

fn execute_brackets(args: BracketsArgs) -> Result<()> {
    let document = read_document(&args.input)?;
    let cursor = Position::new(
        one_based(args.line, "--line")?,
        one_based(args.column, "--column")?,
    );
    let offset = document
        .offset_of(cursor)
        .with_context(|| format!("cursor {}:{} is outside the file", args.line, args.column))?;

    match find_matching_bracket(&document.text(), offset) {
        Some(found) => {
            let anchor = document.position_of(found.anchor);
            let partner = document.position_of(found.partner);
            println!(
                "{}:{} -> {}:{}",
                anchor.line + 1,
                anchor.column + 1,
                partner.line + 1,
                partner.column + 1
            );
        }
        None => println!("No matching bracket."),
    }
    Ok(())
}

fn execute_fold(args: FoldArgs) -> Result<()> {
    let document = read_document(&args.input)?;
    let mut session = EditorSession::new(document);
    for line in &args.lines {
        let index = one_based(*line, "--line")?;
        match session.toggle_fold(index) {
            FoldOutcome::Folded(record) => eprintln!(
                "Folded lines {}-{}",
                record.start_line + 2,
                record.end_line + 1
            ),
            FoldOutcome::Unfolded(record) => eprintln!(
                "Unfolded lines {}-{}",
                record.start_line + 2,
                record.end_line + 1
            ),
            FoldOutcome::NotFoldable => eprintln!("Line {line} does not open a block"),
            FoldOutcome::Unmatched => eprintln!("Line {line} has no closing brace"),
        }
    }

    let document = session.document();
    for index in session.folds().visible_lines(document.line_count()) {
        let marker = if session.folds().is_folded(index) {
            " ..."
        } else {
            ""
        };
        let text = document.line(index).unwrap_or_default();
        println!("{:>4} {text}{marker}", index + 1);
    }
    Ok(())
}

fn execute_edit(args: EditArgs) -> Result<()> {
    let document = read_document(&args.input)?;
    let mut session = EditorSession::new(document);
    if let Some(range) = args.lines {
        let last = session.document().line(range.end()).map(|text| text.chars().count());
        let last = last.ok_or_else(|| {
            anyhow!(
                "line {} is beyond the end of {}",
                range.end() + 1,
                args.input.display()
            )
        })?;
        session.set_selection(Selection::new(
            Position::new(range.start(), 0),
            Position::new(range.end(), last),
        ))?;
    } else if matches!(args.operation, EditOperation::Upper | EditOperation::Lower) {
        session.select_all();
    }

    let summary = match args.operation {
        EditOperation::Duplicate => {
            let copy = session.duplicate_lines()?;
            format!("Duplicated {} line(s)", copy.len())
        }
        EditOperation::Delete => {
            let count = session.target_lines().len();
            session.delete_lines()?;
            format!("Deleted {count} line(s)")
        }
        EditOperation::MoveUp => moved(session.move_lines_up()?, "up"),
        EditOperation::MoveDown => moved(session.move_lines_down()?, "down"),
        EditOperation::ToggleComment => match session.toggle_comment()? {
            CommentAction::Commented => "Commented lines".to_string(),
            CommentAction::Uncommented => "Uncommented lines".to_string(),
        },
        EditOperation::Upper => changed(session.convert_case(CaseTransform::Upper)?),
        EditOperation::Lower => changed(session.convert_case(CaseTransform::Lower)?),
        EditOperation::TrimTrailing => {
            format!("Trimmed {} line(s)", session.trim_trailing_whitespace()?)
        }
        EditOperation::CollapseBlank => format!(
            "Removed {} blank line(s)",
            session.collapse_blank_lines()?
        ),
    };
    eprintln!("{summary}");
    write_result(&args.input, &args.output, &session.document().to_file_text())
}

fn moved(done: bool, direction: &str) -> String {
    if done {
        format!("Moved lines {direction}")
    } else {
        format!("Lines cannot move {direction}")
    }
}

fn changed(done: bool) -> String {
    if done {
        "Converted case".to_string()
    } else {
        "Nothing to convert".to_string()
    }
}

fn execute_normalize(args: NormalizeArgs, store: &PreferencesStore) -> Result<()> {
    let document = read_document(&args.input)?;
    let exclude_strings =
        !args.include_strings && store.preferences().conversion_options().exclude_strings;
    let converted: Vec<String> = document
        .lines()
        .iter()
        .map(|line| normalize_punctuation(line, exclude_strings))
        .collect();
    let changed = converted
        .iter()
        .zip(document.lines())
        .filter(|(after, before)| after != before)
        .count();
    eprintln!("Normalized {changed} line(s)");
    let text = converted.join(document.line_ending().as_str());
    write_result(&args.input, &args.output, &text)
}

fn execute_find(args: FindArgs) -> Result<()> {
    let document = read_document(&args.input)?;
    let matches = match (args.line, args.column) {
        (Some(line), Some(column)) => {
            let caret = Position::new(one_based(line, "--line")?, one_based(column, "--column")?);
            let mut session = EditorSession::new(document.clone());
            session
                .set_selection(Selection::caret(caret))
                .with_context(|| format!("cursor {line}:{column} is outside the file"))?;
            session.find_next(&args.needle).into_iter().collect()
        }
        _ => find_all(&document.text(), &args.needle),
    };

    if matches.is_empty() {
        println!("Not found: {}", args.needle);
    }
    for found in matches {
        let position = document.position_of(found.start);
        println!("{}:{}", position.line + 1, position.column + 1);
    }
    Ok(())
}

fn execute_replace(args: ReplaceArgs) -> Result<()> {
    let mut session = EditorSession::new(read_document(&args.input)?);
    let count = session.replace_all(&args.needle, &args.replacement)?;
    eprintln!("Replaced {count} occurrence(s)");
    write_result(&args.input, &args.output, &session.document().to_file_text())
}

fn execute_doc(args: DocArgs, store: &PreferencesStore) -> Result<()> {
    let keywords = store.preferences().keyword_set();
    match keywords.documentation(&args.name) {
        Some(doc) => {
            println!("{doc}");
            Ok(())
        }
        None if keywords.contains(args.name.trim_end_matches("()")) => {
            println!("{}: no documentation available", args.name);
            Ok(())
        }
        None => bail!("unknown keyword '{}'", args.name),
    }
}

fn execute_catalog(args: CatalogArgs, store: &PreferencesStore) -> Result<()> {
    let catalog = library_catalog(&store.preferences().keyword_set());
    let nodes: Vec<CatalogNode> = match &args.node {
        Some(label) => vec![find_node(&catalog, label)
            .cloned()
            .ok_or_else(|| anyhow!("no catalog entry named '{label}'"))?],
        None => catalog,
    };

    if args.json {
        println!("{}", serde_json::to_string_pretty(&nodes)?);
        return Ok(());
    }
    for node in &nodes {
        print_node(node, 0);
    }
    Ok(())
}

fn print_node(node: &CatalogNode, depth: usize) {
    let indent = "  ".repeat(depth);
    match insertion_text(node) {
        Some(text) => println!("{indent}- {text}"),
        None => {
            println!("{indent}{}", node.label);
            for child in &node.children {
                print_node(child, depth + 1);
            }
        }
    }
}

fn execute_run(args: RunArgs, store: &mut PreferencesStore) -> Result<()> {
    let mut request = store.preferences().run_request(Some(&args.script));
    if let Some(interpreter) = args.interpreter {
        request.interpreter = interpreter.display().to_string();
    }
    if args.no_pause {
        request.pause_on_exit = false;
    }
    if let Some(timeout_ms) = args.timeout_ms {
        request.timeout_ms = Some(timeout_ms.max(1));
    }
    if let Some(dir) = args.working_dir {
        request = request.with_working_dir(dir);
    }

    if args.script.exists() {
        let recorded = args
            .script
            .canonicalize()
            .unwrap_or_else(|_| args.script.clone());
        store
            .record_recent(recorded)
            .context("failed to update recent files")?;
    }

    let result = spawn(request).wait();
    for line in console_report(&result) {
        println!("{}", line.trim_end_matches('\n'));
    }
    Ok(())
}

fn execute_settings_command(command: SettingsCommand, store: &mut PreferencesStore) -> Result<()> {
    match command {
        SettingsCommand::Show => {
            println!("{}", serde_json::to_string_pretty(store.preferences())?);
        }
        SettingsCommand::Export { output } => {
            store
                .export_to(&output)
                .with_context(|| format!("failed to export preferences to {}", output.display()))?;
            println!("Exported preferences to {}", output.display());
        }
        SettingsCommand::Import { input } => {
            if !input.exists() {
                bail!("preferences file '{}' does not exist", input.display());
            }
            store
                .import_from(&input)
                .with_context(|| format!("failed to import preferences from {}", input.display()))?;
            println!("Imported preferences from {}", input.display());
        }
        SettingsCommand::Recent => {
            let recent = store.preferences().recent_files();
            if recent.is_empty() {
                println!("No recent files.");
            }
            for path in recent.iter() {
                println!("{}", path.display());
            }
        }
    }
    Ok(())
}

fn one_based(value: usize, flag: &str) -> Result<usize> {
    value
        .checked_sub(1)
        .ok_or_else(|| anyhow!("{flag} is 1-based; got 0"))
}

fn parse_line_range(raw: &str) -> std::result::Result<LineRange, String> {
    let parse = |part: &str| -> std::result::Result<usize, String> {
        let value: usize = part
            .trim()
            .parse()
            .map_err(|_| format!("'{part}' is not a line number"))?;
        value
            .checked_sub(1)
            .ok_or_else(|| "line numbers start at 1".to_string())
    };
    match raw.split_once('-') {
        Some((start, end)) => Ok(LineRange::new(parse(start)?, parse(end)?)),
        None => Ok(LineRange::single(parse(raw)?)),
    }
}
