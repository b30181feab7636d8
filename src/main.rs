use bedtime_whys::config::{self, Credentials};
use bedtime_whys::library::select;
use bedtime_whys::pager::Reader;
use bedtime_whys::services::{GeminiText, Illustrator};
use bedtime_whys::story::{self, StoryError, StoryOptions, StoryRequest, Workspace};
use bedtime_whys::types::{Age, Tone};
use bedtime_whys::{export, generate, output};
use clap::{Parser, Subcommand};
use std::io::{BufRead, Write};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Arguments for generating a book.
#[derive(clap::Args, Clone)]
struct AskArgs {
    /// The child's "why?" question
    #[arg(long, short)]
    question: String,

    /// Child's age in years (3-10)
    #[arg(long, short, value_parser = parse_age)]
    age: Age,

    /// How the explanation should feel
    #[arg(long, short, value_enum, default_value_t = Tone::Gentle)]
    tone: Tone,

    /// Ignore the saved book and cached illustrations and regenerate
    #[arg(long)]
    refresh: bool,
}

#[derive(Parser)]
#[command(name = "bedtime-whys")]
#[command(about = "Illustrated picture-book answers to children's why-questions")]
#[command(long_about = "\
Illustrated picture-book answers to children's why-questions

Ask a question, pick an age and a tone, and get a short storybook: a few
pages of simple explanation, each with a soft watercolor illustration.
Every book is saved to the library and every illustration is cached, so
asking again costs nothing.

Files under --root:

  root/
  ├── config.toml          # Optional settings (run 'gen-config')
  ├── library.json         # Saved books
  └── generated_images/    # Cached illustrations, one PNG per scene

Environment:
  GEMINI_API_KEY   text generation (and Imagen illustrations)
  OPENAI_API_KEY   OpenAI illustrations
  RUST_LOG         diagnostics on stderr, e.g. RUST_LOG=bedtime_whys=debug

Books are selected by their number in 'library' or a fingerprint prefix.")]
#[command(version)]
struct Cli {
    /// Directory holding config.toml, the library and cached illustrations
    #[arg(long, default_value = ".", global = true)]
    root: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Make (or fetch from the library) a storybook for a question
    Ask(AskArgs),
    /// List saved books
    Library,
    /// Page through a saved book in the terminal
    Read {
        /// Book number from 'library', or a fingerprint prefix
        selector: String,
    },
    /// Write a saved book as a PDF
    Export {
        /// Book number from 'library', or a fingerprint prefix
        selector: String,
        /// Output file (default: <root>/<fingerprint>.pdf)
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Write the whole library as a static HTML storybook
    Render {
        /// Output directory (default: <root>/storybook)
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// List text models available to GEMINI_API_KEY
    Models,
    /// Print a stock config.toml with all options documented
    GenConfig,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();
    let cli = Cli::parse();

    match cli.command {
        Command::Ask(args) => {
            let config = config::load_config(&cli.root)?;
            let credentials = Credentials::from_env();
            credentials.check(&config)?;
            init_thread_pool(&config.processing);

            let text = GeminiText::new(credentials.require_gemini()?, &config.text)?;
            let images = Illustrator::from_config(&config, &credentials)?;
            let workspace = Workspace::from_config(&cli.root, &config);
            let request = StoryRequest {
                question: args.question,
                age: args.age,
                tone: args.tone,
            };

            println!("{}", output::format_parallelism(&config.processing));
            let (tx, rx) = std::sync::mpsc::channel();
            let printer = std::thread::spawn(move || {
                for event in rx {
                    for line in output::format_story_event(&event) {
                        println!("{}", line);
                    }
                }
            });
            let result = story::tell(
                &text,
                &images,
                &workspace,
                &request,
                StoryOptions {
                    refresh: args.refresh,
                },
                Some(tx),
            );
            printer
                .join()
                .map_err(|_| "progress printer thread panicked")?;

            if let Err(StoryError::Parse { raw }) = &result {
                output::print_unparsed_response(raw);
            }
            output::print_outcome(&result?);
        }
        Command::Library => {
            let config = config::load_config(&cli.root)?;
            let workspace = Workspace::from_config(&cli.root, &config);
            output::print_library(&workspace.library.load());
        }
        Command::Read { selector } => {
            let config = config::load_config(&cli.root)?;
            let books = Workspace::from_config(&cli.root, &config).library.load();
            let book = select(&books, &selector)?;
            read_interactively(Reader::new(book))?;
        }
        Command::Export { selector, out } => {
            let config = config::load_config(&cli.root)?;
            let books = Workspace::from_config(&cli.root, &config).library.load();
            let book = select(&books, &selector)?;

            let bytes = export::export_book(book, &config.export)?;
            let out = out.unwrap_or_else(|| cli.root.join(format!("{}.pdf", book.key)));
            std::fs::write(&out, &bytes)?;
            for line in output::format_export(book, &out, bytes.len()) {
                println!("{}", line);
            }
        }
        Command::Render { out } => {
            let config = config::load_config(&cli.root)?;
            let books = Workspace::from_config(&cli.root, &config).library.load();
            let out = out.unwrap_or_else(|| cli.root.join("storybook"));

            let summary = generate::render_site(&books, &out)?;
            for line in output::format_render_summary(&summary, &out) {
                println!("{}", line);
            }
        }
        Command::Models => {
            let config = config::load_config(&cli.root)?;
            let credentials = Credentials::from_env();
            let text = GeminiText::new(credentials.require_gemini()?, &config.text)?;
            for line in output::format_models(&text.list_models()?) {
                println!("{}", line);
            }
        }
        Command::GenConfig => {
            print!("{}", config::stock_config_toml());
        }
    }

    Ok(())
}

/// `n`/Enter: next page, `p`: previous, a number: jump, `q`/EOF: quit.
fn read_interactively(mut reader: Reader) -> std::io::Result<()> {
    let stdin = std::io::stdin();
    let mut input = stdin.lock();
    loop {
        output::print_reader_page(&reader);
        print!("> ");
        std::io::stdout().flush()?;

        let mut line = String::new();
        if input.read_line(&mut line)? == 0 {
            break;
        }
        println!();
        match line.trim() {
            "q" | "quit" => break,
            "p" | "prev" => {
                reader.previous();
            }
            "" | "n" | "next" => {
                if !reader.next() {
                    break;
                }
            }
            other => {
                if let Ok(n) = other.parse::<usize>() {
                    reader.go_to(n.saturating_sub(1));
                }
            }
        }
    }
    Ok(())
}

fn parse_age(s: &str) -> Result<Age, String> {
    let years: u8 = s
        .trim()
        .parse()
        .map_err(|_| format!("`{s}` is not a whole number of years"))?;
    Age::try_from(years)
}

/// Diagnostics go to stderr; stdout is reserved for the user-facing output.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

/// Initialize the rayon thread pool based on processing config.
///
/// Defaults to the number of CPU cores; `max_processes` can raise it up to
/// [`config::MAX_PARALLEL_REQUESTS`].
fn init_thread_pool(processing: &config::ProcessingConfig) {
    let threads = config::effective_threads(processing);
    rayon::ThreadPoolBuilder::new()
        .num_threads(threads)
        .build_global()
        .ok();
}
