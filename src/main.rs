use anyhow::{bail, Context, Result};
use std::cell::RefCell;
use std::path::{Path, PathBuf};
use std::rc::Rc;
use std::time::Duration;

use wordiary::config::Config;
use wordiary::db::{timestamp, DiaryStore};
use wordiary::imaging::{ImageCache, ImageSlot, ImageWorker, Picture, Placeholders, TransformSpec};
use wordiary::journal::Journal;
use wordiary::logging;
use wordiary::photos::PhotoLibrary;
use wordiary::tasks::SlotId;

const THUMB_TIMEOUT: Duration = Duration::from_secs(30);
const GALLERY_SIZE: u32 = 256;

enum Command {
    Add(String),
    Edit(i64, String),
    Mood(i64, Option<String>),
    Delete(i64),
    Photo(PathBuf),
    DeletePhoto(i64),
    Days,
    Show(i64),
    Next { entry: i64, backwards: bool },
    Thumb { input: PathBuf, output: PathBuf, gallery: bool },
}

struct Args {
    config_path: Option<PathBuf>,
    command: Command,
}

fn parse_id(value: Option<&String>, what: &str) -> Result<i64> {
    let value = value.with_context(|| format!("missing {what}"))?;
    value
        .parse()
        .with_context(|| format!("invalid {what}: {value}"))
}

fn parse_command(words: &[String]) -> Result<Command> {
    let Some((name, rest)) = words.split_first() else {
        bail!("no command given");
    };

    let command = match name.as_str() {
        "add" => Command::Add(rest.join(" ")),
        "edit" => Command::Edit(parse_id(rest.first(), "entry id")?, rest[1..].join(" ")),
        "mood" => Command::Mood(
            parse_id(rest.first(), "entry id")?,
            rest.get(1).cloned(),
        ),
        "delete" => Command::Delete(parse_id(rest.first(), "entry id")?),
        "photo" => Command::Photo(PathBuf::from(rest.first().context("missing photo path")?)),
        "delete-photo" => Command::DeletePhoto(parse_id(rest.first(), "day id")?),
        "days" => Command::Days,
        "show" => Command::Show(parse_id(rest.first(), "day id")?),
        "next" => Command::Next {
            entry: parse_id(rest.first(), "entry id")?,
            backwards: rest.iter().any(|a| a == "--back"),
        },
        "thumb" => Command::Thumb {
            input: PathBuf::from(rest.first().context("missing image path")?),
            output: PathBuf::from(rest.get(1).context("missing output path")?),
            gallery: rest.iter().any(|a| a == "--gallery"),
        },
        other => bail!("unknown command: {other}"),
    };
    Ok(command)
}

fn parse_args() -> Args {
    let args: Vec<String> = std::env::args().collect();
    let mut config_path = None;
    let mut words = Vec::new();

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--help" | "-h" => {
                print_help();
                std::process::exit(0);
            }
            "--version" | "-V" => {
                println!("wordiary {}", env!("CARGO_PKG_VERSION"));
                std::process::exit(0);
            }
            "--config" | "-c" => {
                if i + 1 < args.len() {
                    config_path = Some(PathBuf::from(&args[i + 1]));
                    i += 1;
                } else {
                    eprintln!("Error: --config requires a path argument");
                    std::process::exit(1);
                }
            }
            _ => words.extend_from_slice(&args[i..]),
        }
        if !words.is_empty() {
            break;
        }
        i += 1;
    }

    match parse_command(&words) {
        Ok(command) => Args {
            config_path,
            command,
        },
        Err(e) => {
            eprintln!("Error: {e}");
            print_help();
            std::process::exit(1);
        }
    }
}

fn print_help() {
    println!(
        r#"wordiary - a few words and one photo a day

USAGE:
    wordiary [OPTIONS] <COMMAND>

COMMANDS:
    add <message...>              Write a new entry for today
    edit <entry> <message...>     Change an entry's message
    mood <entry> [mood]           Set or clear an entry's mood
    delete <entry>                Delete an entry
    photo <path>                  Copy a picture in as today's photo
    delete-photo <day>            Delete a day's photo
    days                          List days, newest first
    show <day>                    Show a day and its entries
    next <entry> [--back]         Show the following (or previous) entry
    thumb <path> <out.png> [--gallery]
                                  Render a thumbnail

OPTIONS:
    --config, -c PATH   Path to config file
    --version, -V       Show version
    --help, -h          Show this help message

ENVIRONMENT:
    WORDIARY_CONFIG     Path to config file (overrides default location)
    WORDIARY_LOG        Log level (trace, debug, info, warn, error)

Config file location: $XDG_CONFIG_HOME/wordiary/config.toml"#
    );
}

/// Slot that keeps the last image it was given.
struct FileSlot {
    id: SlotId,
    picture: RefCell<Option<Picture>>,
}

impl ImageSlot for FileSlot {
    fn slot_id(&self) -> SlotId {
        self.id
    }

    fn show_placeholder(&self, _picture: Picture) {}

    fn show_image(&self, picture: Picture) {
        self.picture.replace(Some(picture));
    }
}

fn print_day(store: &DiaryStore, id: i64) -> Result<()> {
    let day = store
        .get_day_by_id(id)?
        .with_context(|| format!("no day with id {id}"))?;
    println!("Day {} - {}", day.id, timestamp::display_day(&day.created));
    if day.has_photo() {
        println!("  photo: {}", day.filename);
    }
    for entry in store.get_entries_by_day(day.id)? {
        print_entry_line(&entry);
    }
    Ok(())
}

fn print_entry_line(entry: &wordiary::db::Entry) {
    let mood = entry.mood.as_deref().map(|m| format!(" [{m}]")).unwrap_or_default();
    println!(
        "  #{} {}{} {}",
        entry.id,
        timestamp::display_entry(&entry.created),
        mood,
        entry.message
    );
}

fn render_thumbnail(config: &Config, input: &Path, output: &Path, gallery: bool) -> Result<()> {
    let density = config.images.effective_density();
    let placeholders = Placeholders::load(config.images.placeholders_dir.as_deref(), density)?;
    let mut worker = ImageWorker::new(
        ImageCache::from_config(&config.images),
        placeholders,
        config.images.worker_threads,
    )?;

    let spec = if gallery {
        TransformSpec::gallery_thumbnail(density, GALLERY_SIZE)
    } else {
        TransformSpec::list_thumbnail(density)
    };
    let slot = Rc::new(FileSlot {
        id: SlotId::new(),
        picture: RefCell::new(None),
    });

    worker.execute(&slot, Some(&input.to_string_lossy()), &spec);
    worker.wait(THUMB_TIMEOUT);

    let picture = slot
        .picture
        .borrow_mut()
        .take()
        .with_context(|| format!("could not render {:?}", input))?;
    picture
        .save(output)
        .with_context(|| format!("Failed to write {:?}", output))?;
    println!("{}x{} -> {}", picture.width(), picture.height(), output.display());
    Ok(())
}

fn run(config: &Config, journal: &Journal, command: Command) -> Result<()> {
    let store = journal.store();
    match command {
        Command::Add(message) => println!("{}", journal.new_entry(&message)?),
        Command::Edit(id, message) => println!("{}", journal.edit_message(id, &message)?),
        Command::Mood(id, mood) => println!("{}", journal.set_mood(id, mood.as_deref())?),
        Command::Delete(id) => println!("{}", journal.delete_entry(id)?),
        Command::Photo(path) => println!("{}", journal.import_photo(&path)?),
        Command::DeletePhoto(id) => println!("{}", journal.delete_photo(id)?),
        Command::Days => {
            for day in store.get_all_days()? {
                let photo = if day.has_photo() { " (photo)" } else { "" };
                println!(
                    "{:>5}  {}  {} entries{}",
                    day.id,
                    timestamp::display_day(&day.created),
                    store.count_entries(day.id)?,
                    photo
                );
            }
        }
        Command::Show(id) => print_day(store, id)?,
        Command::Next { entry, backwards } => {
            if !store.has_next_entry(entry, backwards)? {
                println!("No further entries");
            }
            print_entry_line(&store.get_next_entry(entry, backwards)?);
        }
        Command::Thumb {
            input,
            output,
            gallery,
        } => render_thumbnail(config, &input, &output, gallery)?,
    }
    Ok(())
}

fn main() -> Result<()> {
    let args = parse_args();

    // Logging is best effort; the CLI works without it.
    let _ = logging::init(Some(Config::config_dir().join("logs")));

    let config = match &args.config_path {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };

    let store = DiaryStore::open(&config.db_path, config.diary.grace_period)?;
    store.initialize()?;

    let journal = Journal::new(
        store,
        PhotoLibrary::new(&config.photos),
        ImageCache::from_config(&config.images),
    );
    let result = run(&config, &journal, args.command);
    journal.into_store().close()?;
    result
}
