//! `ttdemo`: a small notes manager built on tooltree.
//!
//! ```text
//! ttdemo note add <text...> [--tag TAG]...
//! ttdemo note list [--tag TAG] [--json]      (also the default command)
//! ttdemo note done <id>
//! ttdemo note remove <id>
//! ttdemo stats                               (reports plugin, async)
//! ttdemo n ...                               (alias for `note ...`)
//! ttdemo cd <store|home>
//! ```
//!
//! Notes live in a JSON file. The store is an extra-data getter, so it is
//! only opened by commands that declare it.

pub mod store;

use std::path::{Path, PathBuf};

use anyhow::anyhow;
use tooltree::{
    App, ArgSpec, CommandIndex, CommandSequence, CommandSpec, ExtraDataGetter, FunctionArgs,
    Handler, Middleware, Output, Plugin, SetupError, OUTPUT_KEY,
};

use crate::store::{Note, NoteStore};

/// Extra-data key of the [`NoteStore`].
pub const STORE_KEY: &str = "store";

/// Environment variable overriding the notes file.
pub const STORE_ENV: &str = "TTDEMO_STORE";

const DEFAULT_STORE: &str = "notes.json";

/// The notes file: `$TTDEMO_STORE`, or `notes.json` in the working directory.
pub fn store_path() -> PathBuf {
    std::env::var_os(STORE_ENV)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_STORE))
}

/// Builds the app over the notes file at `store`, writing to `output`.
pub fn app(store: &Path, output: Output) -> Result<App, SetupError> {
    let getter_path = store.to_path_buf();
    let cd_root = store
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("."));

    App::builder()
        .configure(|c| {
            c.base_command("ttdemo")
                .description("keep short notes in a json file")
                .version(env!("CARGO_PKG_VERSION"))
                .standard_subcommands()
                .include_cd_subcommand(true)
                .cd_dir_getter(move |name| cd_destination(&cd_root, name))
                .cd_dir_help("store", "directory holding the notes file")
                .cd_dir_help("home", "your home directory")
                .default_command_sequence(["note", "list"])
                .command_sequence_alias(["n"], ["note"])
                .help_category(["note", "add"], "notes")
                .help_category(["note", "list"], "notes")
                .help_category(["note", "done"], "notes")
                .help_category(["note", "remove"], "notes")
                .extra_data_getter(
                    STORE_KEY,
                    ExtraDataGetter::from_fn(move |_| NoteStore::open(getter_path.clone())),
                )
                .pre_middleware(Middleware::from_fn(|ctx, _| {
                    tracing::debug!(command = %ctx.sequence_text(), "running");
                    Ok(())
                }))
        })
        .command(["note", "add"], add_spec())?
        .command(["note", "list"], list_spec())?
        .command(["note", "done"], done_spec())?
        .command(["note", "remove"], remove_spec())?
        .plugin(reports_plugin())
        .output(output)
        .build()
}

fn cd_destination(root: &Path, name: &str) -> anyhow::Result<String> {
    match name {
        "store" => Ok(root.display().to_string()),
        "home" => std::env::var("HOME").map_err(|_| anyhow!("HOME is not set")),
        other => Err(anyhow!("unknown destination: {}", other)),
    }
}

fn store_command(handler: fn(&FunctionArgs) -> anyhow::Result<()>) -> CommandSpec {
    CommandSpec::new(Handler::from_fn(handler))
        .extra_data(STORE_KEY)
        .extra_data(OUTPUT_KEY)
}

fn id_arg() -> ArgSpec {
    ArgSpec::new("id").int().help("note id")
}

fn add_spec() -> CommandSpec {
    store_command(add_note)
        .help("add a note")
        .arg(
            ArgSpec::new("text")
                .nargs(tooltree::Nargs::OneOrMore)
                .help("note text"),
        )
        .arg(
            ArgSpec::with_names(["-t", "--tag"])
                .append()
                .help("tag the note (repeatable)"),
        )
}

fn list_spec() -> CommandSpec {
    store_command(list_notes)
        .help("list notes")
        .arg(ArgSpec::new("--tag").help("only notes with this tag"))
        .arg(ArgSpec::new("--json").store_true().help("print as json"))
}

fn done_spec() -> CommandSpec {
    store_command(mark_done).help("mark a note done").arg(id_arg())
}

fn remove_spec() -> CommandSpec {
    store_command(remove_note).help("delete a note").arg(id_arg())
}

fn add_note(args: &FunctionArgs) -> anyhow::Result<()> {
    let store = args.extra::<NoteStore>(STORE_KEY)?;
    let text = args.get::<Vec<String>>("text")?.join(" ");
    let note = store.add(text, args.get("tag")?)?;
    args.extra::<Output>(OUTPUT_KEY)?
        .line(&format!("added note {}", note.id))?;
    Ok(())
}

fn list_notes(args: &FunctionArgs) -> anyhow::Result<()> {
    let store = args.extra::<NoteStore>(STORE_KEY)?;
    let output = args.extra::<Output>(OUTPUT_KEY)?;
    let tag: Option<String> = args.get("tag")?;
    let notes: Vec<Note> = store
        .notes()
        .into_iter()
        .filter(|note| tag.as_ref().map_or(true, |tag| note.tags.contains(tag)))
        .collect();

    if args.flag("json") {
        output.line(&serde_json::to_string_pretty(&notes)?)?;
        return Ok(());
    }
    if notes.is_empty() {
        output.line("no notes")?;
        return Ok(());
    }
    for note in notes {
        output.line(&format_note(&note))?;
    }
    Ok(())
}

fn format_note(note: &Note) -> String {
    let mark = if note.done { "x" } else { " " };
    let mut line = format!("{:>3} [{}] {}", note.id, mark, note.text);
    for tag in &note.tags {
        line.push_str(&format!(" #{}", tag));
    }
    line
}

fn mark_done(args: &FunctionArgs) -> anyhow::Result<()> {
    let id: u64 = args.get("id")?;
    args.extra::<NoteStore>(STORE_KEY)?.mark_done(id)?;
    args.extra::<Output>(OUTPUT_KEY)?
        .line(&format!("note {} done", id))?;
    Ok(())
}

fn remove_note(args: &FunctionArgs) -> anyhow::Result<()> {
    let id: u64 = args.get("id")?;
    let note = args.extra::<NoteStore>(STORE_KEY)?.remove(id)?;
    args.extra::<Output>(OUTPUT_KEY)?
        .line(&format!("removed note {}: {}", note.id, note.text))?;
    Ok(())
}

/// Reporting commands, merged as a plugin under their own help category.
fn reports_plugin() -> Plugin {
    let mut index = CommandIndex::new();
    index.insert(CommandSequence::from(["stats"]), stats_spec());
    Plugin::new(index)
        .help_category("reports")
        .requires(STORE_KEY)
        .requires(OUTPUT_KEY)
}

fn stats_spec() -> CommandSpec {
    CommandSpec::new(Handler::from_async_fn(|args: FunctionArgs| async move {
        let notes = args.extra::<NoteStore>(STORE_KEY)?.notes();
        let done = notes.iter().filter(|n| n.done).count();
        args.extra::<Output>(OUTPUT_KEY)?.line(&format!(
            "{} notes, {} done, {} open",
            notes.len(),
            done,
            notes.len() - done
        ))?;
        Ok::<_, anyhow::Error>(())
    }))
    .help("summarize notes")
    .extra_data(STORE_KEY)
    .extra_data(OUTPUT_KEY)
}
