use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Args, Parser, Subcommand};
use kinship::config::{
    ConfigError, default_global_config_yaml, default_repo_config_yaml, load_effective_config,
};
use kinship::error::{PersistError, ValidationError};
use kinship::model::{PartialDate, PersonPatch};
use kinship::mutation::{PanelRow, PanelTarget};
use kinship::persist::{LocalStore, Persistence, RemoteSync, SqliteStore};
use kinship::session::{EventOutcome, Session, UiEvent, ViewMode};
use serde_json::{Value, json};
use tracing_subscriber::EnvFilter;

const LOG_ENV: &str = "KINSHIP_LOG";

#[derive(Debug)]
struct CliError {
    code: &'static str,
    message: String,
}

impl CliError {
    fn new(code: &'static str, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    fn io(code: &'static str, err: io::Error) -> Self {
        Self::new(code, err.to_string())
    }

    fn precondition(message: impl Into<String>) -> Self {
        Self::new("precondition_failed", message)
    }

    fn not_found(id: &str) -> Self {
        Self::new("not_found", format!("no person with id `{id}`"))
    }
}

impl From<PersistError> for CliError {
    fn from(value: PersistError) -> Self {
        Self::new(value.code(), value.to_string())
    }
}

impl From<ValidationError> for CliError {
    fn from(value: ValidationError) -> Self {
        Self::new(value.code(), value.to_string())
    }
}

impl From<ConfigError> for CliError {
    fn from(value: ConfigError) -> Self {
        Self::new("config_error", value.to_string())
    }
}

impl From<serde_json::Error> for CliError {
    fn from(value: serde_json::Error) -> Self {
        Self::new("json_error", value.to_string())
    }
}

#[derive(Parser, Debug)]
#[command(name = "kinship")]
#[command(about = "Family trees you can edit from the command line")]
struct Cli {
    #[arg(long, global = true)]
    global: bool,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    Init,
    /// List trees in this workspace.
    Trees,
    NewTree(NewTreeArgs),
    /// Make another tree the active one.
    Use(TreeIdArgs),
    DeleteTree(TreeIdArgs),
    Add(AddArgs),
    AddChild(RelativeArgs),
    AddSibling(SiblingArgs),
    AddSpouse(RelativeArgs),
    RemoveSpouse(RemoveSpouseArgs),
    Update(UpdateArgs),
    SetParents(SetParentsArgs),
    Remove(RemoveArgs),
    Reorder(ReorderArgs),
    Collapse(PersonArgs),
    /// Edit a children or siblings list in one go.
    Manage(ManageArgs),
    Show(ShowArgs),
    Get(PersonArgs),
    /// Report broken links in the active tree.
    Check,
    Push,
    Pull,
}

#[derive(Args, Debug)]
struct NewTreeArgs {
    title: String,
}

#[derive(Args, Debug)]
struct TreeIdArgs {
    tree_id: String,
}

#[derive(Args, Debug)]
struct PersonArgs {
    person_id: String,
}

#[derive(Args, Debug)]
struct AddArgs {
    name: String,
    #[arg(long = "parent")]
    parents: Vec<String>,
    #[arg(long)]
    spouse: Option<String>,
    #[arg(long)]
    birth_order: Option<i64>,
}

#[derive(Args, Debug)]
struct RelativeArgs {
    person_id: String,
    name: String,
}

#[derive(Args, Debug)]
struct SiblingArgs {
    person_id: String,
    name: String,
    /// Add a new root next to a root person.
    #[arg(long)]
    root: bool,
}

#[derive(Args, Debug)]
struct RemoveSpouseArgs {
    person_id: String,
    spouse_id: String,
}

#[derive(Args, Debug)]
struct UpdateArgs {
    person_id: String,
    #[arg(long)]
    name: Option<String>,
    #[arg(long = "nickname")]
    nicknames: Vec<String>,
    #[arg(long)]
    clear_nicknames: bool,
    /// YYYY, YYYY-MM or YYYY-MM-DD; empty clears.
    #[arg(long)]
    birth: Option<String>,
    #[arg(long)]
    death: Option<String>,
    #[arg(long)]
    birth_place: Option<String>,
    #[arg(long)]
    location: Option<String>,
    #[arg(long)]
    maiden_name: Option<String>,
    #[arg(long)]
    occupation: Option<String>,
    #[arg(long)]
    education: Option<String>,
    #[arg(long)]
    hobbies: Option<String>,
    #[arg(long)]
    notes: Option<String>,
    #[arg(long)]
    photo: Option<String>,
    #[arg(long = "gallery")]
    gallery: Vec<String>,
}

#[derive(Args, Debug)]
struct SetParentsArgs {
    person_id: String,
    parent_ids: Vec<String>,
}

#[derive(Args, Debug)]
struct RemoveArgs {
    person_id: String,
    /// Also delete every descendant.
    #[arg(long)]
    branch: bool,
}

#[derive(Args, Debug)]
struct ReorderArgs {
    /// Omit to reorder the roots.
    #[arg(long)]
    parent: Option<String>,
    #[arg(required = true)]
    ids: Vec<String>,
}

#[derive(Args, Debug)]
struct ManageArgs {
    #[arg(long, conflicts_with = "siblings_of", required_unless_present = "siblings_of")]
    children_of: Option<String>,
    #[arg(long)]
    siblings_of: Option<String>,
    /// `id=Name` keeps and renames, `id=` deletes, `Name` adds.
    rows: Vec<String>,
}

#[derive(Args, Debug)]
struct ShowArgs {
    #[arg(long)]
    generations: bool,
    /// Print the rendered lines instead of JSON.
    #[arg(long)]
    pretty: bool,
}

#[derive(Debug, Clone)]
struct StatePaths {
    root: PathBuf,
    repo_config: PathBuf,
    user_config: PathBuf,
    home: PathBuf,
    mode: StorageMode,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StorageMode {
    RepoLocal,
    Global,
}

fn main() -> ExitCode {
    init_tracing();
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            let payload = json!({
                "error": {
                    "code": err.code,
                    "message": err.message,
                }
            });
            eprintln!("{payload}");
            ExitCode::FAILURE
        }
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .try_init();
}

fn run() -> Result<(), CliError> {
    let cli = Cli::parse();
    let cwd = std::env::current_dir().map_err(|err| CliError::io("cwd_error", err))?;
    let paths = state_paths(&cwd, cli.global)?;
    if let Command::Init = cli.command {
        return cmd_init(&cwd, &paths);
    }

    require_initialized(&paths)?;
    let mut session = open_session(&cwd, &paths)?;
    let result = dispatch(&mut session, cli.command);
    session.flush();
    result
}

fn dispatch(session: &mut Session, command: Command) -> Result<(), CliError> {
    match command {
        Command::Init => Ok(()),
        Command::Trees => cmd_trees(session),
        Command::NewTree(args) => cmd_new_tree(session, args),
        Command::Use(args) => cmd_use(session, args),
        Command::DeleteTree(args) => cmd_delete_tree(session, args),
        Command::Add(args) => cmd_add(session, args),
        Command::AddChild(args) => cmd_add_child(session, args),
        Command::AddSibling(args) => cmd_add_sibling(session, args),
        Command::AddSpouse(args) => cmd_add_spouse(session, args),
        Command::RemoveSpouse(args) => cmd_remove_spouse(session, args),
        Command::Update(args) => cmd_update(session, args),
        Command::SetParents(args) => cmd_set_parents(session, args),
        Command::Remove(args) => cmd_remove(session, args),
        Command::Reorder(args) => cmd_reorder(session, args),
        Command::Collapse(args) => cmd_collapse(session, args),
        Command::Manage(args) => cmd_manage(session, args),
        Command::Show(args) => cmd_show(session, args),
        Command::Get(args) => cmd_get(session, args),
        Command::Check => cmd_check(session),
        Command::Push => cmd_push(session),
        Command::Pull => cmd_pull(session),
    }
}

fn cmd_init(cwd: &Path, paths: &StatePaths) -> Result<(), CliError> {
    fs::create_dir_all(&paths.root).map_err(|err| CliError::io("mkdir_error", err))?;
    write_default_config(paths)?;
    let mut session = open_session(cwd, paths)?;
    let snapshot = session.persistence().local().path().to_path_buf();
    if !snapshot.exists() {
        session.save()?;
    }
    session.flush();

    print_json(&json!({
        "status": "ok",
        "kinship_dir": paths.root,
        "snapshot": snapshot,
        "mode": match paths.mode {
            StorageMode::RepoLocal => "repo",
            StorageMode::Global => "global",
        },
    }))
}

fn cmd_trees(session: &mut Session) -> Result<(), CliError> {
    print_json(&json!({
        "active": session.tree().id,
        "trees": session.trees(),
    }))
}

fn cmd_new_tree(session: &mut Session, args: NewTreeArgs) -> Result<(), CliError> {
    let id = session.create_tree(&args.title)?;
    print_json(&json!({
        "status": "ok",
        "tree": session.tree().summary(),
        "id": id,
    }))
}

fn cmd_use(session: &mut Session, args: TreeIdArgs) -> Result<(), CliError> {
    if !session.switch_tree(&args.tree_id)? {
        return Err(CliError::new(
            "tree_not_found",
            format!("no tree with id `{}`", args.tree_id),
        ));
    }
    print_json(&json!({
        "status": "ok",
        "active": session.tree().id,
    }))
}

fn cmd_delete_tree(session: &mut Session, args: TreeIdArgs) -> Result<(), CliError> {
    if !session.delete_tree(&args.tree_id)? {
        return Err(CliError::new(
            "tree_not_found",
            format!("no tree with id `{}`", args.tree_id),
        ));
    }
    print_json(&json!({
        "status": "ok",
        "deleted": args.tree_id,
        "active": session.tree().id,
    }))
}

fn cmd_add(session: &mut Session, args: AddArgs) -> Result<(), CliError> {
    let created = session.mutate(|tree| {
        tree.add_person(
            &args.name,
            &args.parents,
            args.spouse.as_deref(),
            args.birth_order,
        )
    })?;
    let id = created.ok_or_else(|| {
        CliError::precondition(
            "could not add person: check the name, that parents exist (at most two) and that the spouse is unmarried",
        )
    })?;
    print_created(session, &id)
}

fn cmd_add_child(session: &mut Session, args: RelativeArgs) -> Result<(), CliError> {
    let created = session.mutate(|tree| tree.add_child(&args.person_id, &args.name))?;
    let id = created.ok_or_else(|| unknown_or_blank(session, &args.person_id))?;
    print_created(session, &id)
}

fn cmd_add_sibling(session: &mut Session, args: SiblingArgs) -> Result<(), CliError> {
    let created = session.mutate(|tree| {
        if args.root {
            tree.add_root_sibling(&args.person_id, &args.name)
        } else {
            tree.add_sibling(&args.person_id, &args.name)
        }
    })?;
    let id = match created {
        Some(id) => id,
        None if !session.tree().people.contains(&args.person_id) => {
            return Err(CliError::not_found(&args.person_id));
        }
        None if args.root => {
            return Err(CliError::precondition(format!(
                "`{}` is not a root person",
                args.person_id
            )));
        }
        None => {
            return Err(CliError::precondition(format!(
                "`{}` has no parents; use --root to add a root sibling",
                args.person_id
            )));
        }
    };
    print_created(session, &id)
}

fn cmd_add_spouse(session: &mut Session, args: RelativeArgs) -> Result<(), CliError> {
    let created = session.mutate(|tree| tree.add_spouse(&args.person_id, &args.name))?;
    let id = match created {
        Some(id) => id,
        None if !session.tree().people.contains(&args.person_id) => {
            return Err(CliError::not_found(&args.person_id));
        }
        None => {
            return Err(CliError::precondition(format!(
                "`{}` already has a spouse",
                args.person_id
            )));
        }
    };
    print_created(session, &id)
}

fn cmd_remove_spouse(session: &mut Session, args: RemoveSpouseArgs) -> Result<(), CliError> {
    let removed = session.mutate(|tree| tree.delete_spouse(&args.person_id, &args.spouse_id))?;
    if !removed {
        return Err(CliError::precondition(format!(
            "`{}` is not the spouse of `{}`",
            args.spouse_id, args.person_id
        )));
    }
    print_json(&json!({
        "status": "ok",
        "deleted": [args.spouse_id],
    }))
}

fn cmd_update(session: &mut Session, args: UpdateArgs) -> Result<(), CliError> {
    let person_id = args.person_id.clone();
    let patch = patch_from_args(args)?;
    if patch.is_empty() {
        return Err(CliError::new("empty_update", "no fields to update"));
    }
    if !session.tree().people.contains(&person_id) {
        return Err(CliError::not_found(&person_id));
    }
    let changed = session.mutate(|tree| tree.update_person(&person_id, patch))??;
    print_json(&json!({
        "status": "ok",
        "changed": changed,
        "person": session.tree().people.get(&person_id),
    }))
}

fn cmd_set_parents(session: &mut Session, args: SetParentsArgs) -> Result<(), CliError> {
    if !session.tree().people.contains(&args.person_id) {
        return Err(CliError::not_found(&args.person_id));
    }
    let changed = session.mutate(|tree| tree.set_parents(&args.person_id, &args.parent_ids))??;
    print_json(&json!({
        "status": "ok",
        "changed": changed,
        "person": session.tree().people.get(&args.person_id),
        "roots": session.tree().root_person_ids,
    }))
}

fn cmd_remove(session: &mut Session, args: RemoveArgs) -> Result<(), CliError> {
    let deleted = session.mutate(|tree| {
        if args.branch {
            tree.delete_branch(&args.person_id)
        } else if tree.remove_person(&args.person_id) {
            vec![args.person_id.clone()]
        } else {
            Vec::new()
        }
    })?;
    if deleted.is_empty() {
        return Err(CliError::not_found(&args.person_id));
    }
    print_json(&json!({
        "status": "ok",
        "deleted": deleted,
    }))
}

fn cmd_reorder(session: &mut Session, args: ReorderArgs) -> Result<(), CliError> {
    let outcome = session.dispatch(UiEvent::ReorderCommitted {
        parent_id: args.parent.clone(),
        ids: args.ids,
    })?;
    if outcome != EventOutcome::Changed {
        let scope = match &args.parent {
            Some(parent) => format!("children of `{parent}`"),
            None => "root people".to_string(),
        };
        return Err(CliError::precondition(format!(
            "ids must be distinct {scope}"
        )));
    }
    print_json(&json!({
        "status": "ok",
        "roots": session.tree().root_person_ids,
    }))
}

fn cmd_collapse(session: &mut Session, args: PersonArgs) -> Result<(), CliError> {
    let outcome = session.dispatch(UiEvent::collapse_toggled(&args.person_id))?;
    if outcome != EventOutcome::Changed {
        return Err(CliError::precondition(format!(
            "`{}` has no children to collapse",
            args.person_id
        )));
    }
    print_json(&json!({
        "status": "ok",
        "collapsed": session.tree().collapsed_ids.contains(&args.person_id),
    }))
}

fn cmd_manage(session: &mut Session, args: ManageArgs) -> Result<(), CliError> {
    let target = match (args.children_of, args.siblings_of) {
        (Some(parent), _) => PanelTarget::ChildrenOf(parent),
        (None, Some(person)) => PanelTarget::SiblingsOf(person),
        (None, None) => {
            return Err(CliError::new(
                "invalid_manage_args",
                "use --children-of or --siblings-of",
            ));
        }
    };
    let rows: Vec<PanelRow> = args.rows.iter().map(|raw| parse_panel_row(raw)).collect();
    let report = session
        .mutate(|tree| tree.reconcile_panel(&target, &rows))?
        .ok_or_else(|| {
            CliError::precondition("unknown person, or a row names someone outside the list")
        })?;
    print_json(&json!({
        "status": "ok",
        "report": report,
    }))
}

fn cmd_show(session: &mut Session, args: ShowArgs) -> Result<(), CliError> {
    let mode = if args.generations {
        ViewMode::Generations
    } else {
        ViewMode::Branches
    };
    let view = session.set_mode(mode).clone();
    if args.pretty {
        print!("{}", view.text());
        return Ok(());
    }
    print_json(&json!({
        "tree": session.tree().id,
        "mode": mode,
        "lines": view.lines,
        "handlers": view.handlers,
    }))
}

fn cmd_get(session: &mut Session, args: PersonArgs) -> Result<(), CliError> {
    let detail = session
        .person_detail(&args.person_id)
        .ok_or_else(|| CliError::not_found(&args.person_id))?;
    print_json(&serde_json::to_value(detail)?)
}

fn cmd_check(session: &mut Session) -> Result<(), CliError> {
    let violations = session.tree().check_invariants();
    print_json(&json!({
        "tree": session.tree().id,
        "ok": violations.is_empty(),
        "violations": violations,
    }))
}

fn cmd_push(session: &mut Session) -> Result<(), CliError> {
    let queued = session.push_all().ok_or_else(remote_not_configured)?;
    print_json(&json!({
        "status": "ok",
        "queued": queued,
    }))
}

fn cmd_pull(session: &mut Session) -> Result<(), CliError> {
    let pulled = session.pull()?.ok_or_else(remote_not_configured)?;
    print_json(&json!({
        "status": "ok",
        "pulled": pulled,
        "active": session.tree().id,
    }))
}

fn remote_not_configured() -> CliError {
    CliError::new(
        "remote_not_configured",
        "no remote store configured; set `remote.path` and `remote.owner`",
    )
}

fn unknown_or_blank(session: &Session, person_id: &str) -> CliError {
    if session.tree().people.contains(person_id) {
        CliError::precondition("name must not be empty")
    } else {
        CliError::not_found(person_id)
    }
}

fn print_created(session: &Session, id: &str) -> Result<(), CliError> {
    print_json(&json!({
        "status": "ok",
        "id": id,
        "person": session.tree().people.get(id),
    }))
}

fn patch_from_args(args: UpdateArgs) -> Result<PersonPatch, CliError> {
    let nicknames = if args.clear_nicknames {
        Some(Vec::new())
    } else if args.nicknames.is_empty() {
        None
    } else {
        Some(args.nicknames)
    };
    Ok(PersonPatch {
        name: args.name,
        nicknames,
        birth_date: args.birth.as_deref().map(parse_optional_date).transpose()?,
        death_date: args.death.as_deref().map(parse_optional_date).transpose()?,
        birth_place: args.birth_place.map(clear_if_blank),
        location: args.location.map(clear_if_blank),
        maiden_name: args.maiden_name.map(clear_if_blank),
        occupation: args.occupation.map(clear_if_blank),
        education: args.education.map(clear_if_blank),
        hobbies: args.hobbies.map(clear_if_blank),
        notes: args.notes.map(clear_if_blank),
        photo: args.photo.map(clear_if_blank),
        gallery: (!args.gallery.is_empty()).then_some(args.gallery),
    })
}

fn parse_optional_date(raw: &str) -> Result<Option<PartialDate>, ValidationError> {
    if raw.trim().is_empty() {
        return Ok(None);
    }
    PartialDate::parse(raw).map(Some)
}

fn clear_if_blank(value: String) -> Option<String> {
    (!value.trim().is_empty()).then_some(value)
}

fn parse_panel_row(raw: &str) -> PanelRow {
    match raw.split_once('=') {
        Some((id, name)) if !id.trim().is_empty() => PanelRow::existing(id.trim(), name),
        Some((_, name)) => PanelRow::new_person(name),
        None => PanelRow::new_person(raw),
    }
}

fn open_session(cwd: &Path, paths: &StatePaths) -> Result<Session, CliError> {
    let config = load_effective_config(cwd, Some(&paths.repo_config), Some(&paths.user_config))?;
    let local = LocalStore::new(config.snapshot_path(&paths.root, &paths.home));
    let persistence = match config.remote_path(&paths.home) {
        Some((path, owner)) => {
            let store = SqliteStore::open(&path, owner)?;
            let remote = RemoteSync::spawn(store, owner)?;
            Persistence::LocalPlusRemote { local, remote }
        }
        None => Persistence::LocalOnly(local),
    };
    Ok(Session::open(persistence, &config.default_title)?)
}

fn state_paths(cwd: &Path, global: bool) -> Result<StatePaths, CliError> {
    let home = home_dir()?;
    let (root, mode) = if global {
        (home.join(".kinship"), StorageMode::Global)
    } else {
        (cwd.join(".kinship"), StorageMode::RepoLocal)
    };

    Ok(StatePaths {
        repo_config: cwd.join(".kinship").join("config.yml"),
        user_config: home.join(".kinship").join("config.yml"),
        root,
        home,
        mode,
    })
}

fn require_initialized(paths: &StatePaths) -> Result<(), CliError> {
    if !paths.root.exists() {
        return Err(CliError::new(
            "not_initialized",
            "no family tree here; run `kinship init`",
        ));
    }
    Ok(())
}

fn write_default_config(paths: &StatePaths) -> Result<(), CliError> {
    let config_path = match paths.mode {
        StorageMode::RepoLocal => &paths.repo_config,
        StorageMode::Global => &paths.user_config,
    };
    if config_path.exists() {
        return Ok(());
    }
    if let Some(parent) = config_path.parent() {
        fs::create_dir_all(parent).map_err(|err| CliError::io("mkdir_error", err))?;
    }
    let default = match paths.mode {
        StorageMode::RepoLocal => default_repo_config_yaml(),
        StorageMode::Global => default_global_config_yaml(),
    };
    fs::write(config_path, default).map_err(|err| CliError::io("write_error", err))
}

fn home_dir() -> Result<PathBuf, CliError> {
    std::env::var_os("HOME")
        .map(PathBuf::from)
        .ok_or_else(|| CliError::new("home_error", "HOME environment variable is not set"))
}

fn print_json(value: &Value) -> Result<(), CliError> {
    let rendered = serde_json::to_string(value)?;
    println!("{rendered}");
    Ok(())
}
