#![forbid(unsafe_code)]

use std::io::Write;

use castiq::{
    api::{CatchesApi, HttpApi},
    charts::{ChartData, ChartKind, CHART_KINDS},
    config::Config,
    models::{normalize_date_input, normalize_time_input, Catch, CatchDraft},
    store::{CatchStore, TableView},
};
use dotenvy::dotenv;
use eyre::{Result, WrapErr};
use log::warn;
use tokio::io::{AsyncBufReadExt, BufReader, Lines, Stdin};

type InputLines = Lines<BufReader<Stdin>>;

/// Everything the UI can ask of the controller.
#[derive(Debug, Clone, PartialEq)]
enum Action {
    Help,
    Quit,
    Show,
    Refresh,
    Ping,
    Search(String),
    Next,
    Prev,
    Page(usize),
    Add,
    Edit(i64),
    Delete(i64),
    Chart(ChartKind),
}

impl Action {
    fn parse(line: &str) -> Option<Self> {
        let line = line.trim();
        let (command, rest) = match line.split_once(char::is_whitespace) {
            Some((command, rest)) => (command, rest.trim()),
            None => (line, ""),
        };

        match command {
            "" | "show" => Some(Self::Show),
            "help" => Some(Self::Help),
            "quit" | "exit" => Some(Self::Quit),
            "refresh" => Some(Self::Refresh),
            "ping" => Some(Self::Ping),
            "search" => Some(Self::Search(rest.to_string())),
            "next" => Some(Self::Next),
            "prev" => Some(Self::Prev),
            "page" => rest.parse().ok().map(Self::Page),
            "add" => Some(Self::Add),
            "edit" => rest.parse().ok().map(Self::Edit),
            "delete" => rest.parse().ok().map(Self::Delete),
            "chart" => CHART_KINDS.get(rest).copied().map(Self::Chart),
            _ => None,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    pretty_env_logger::init();
    dotenv().ok();

    let config = Config::load().wrap_err("could not load configuration")?;
    let api = HttpApi::new(&config).wrap_err("could not build the backend client")?;
    let mut store = CatchStore::new(api);

    println!("castiq fishing log, user {}", config.user_id);
    match store.refresh(false).await {
        Ok(()) => print_table(&store.view()),
        Err(err) => {
            warn!("initial fetch failed: {err}");
            println!("could not load catches: {err}");
        }
    }
    println!("type `help` for commands");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    prompt_marker()?;
    while let Some(line) = lines.next_line().await? {
        let Some(action) = Action::parse(&line) else {
            println!("unknown command, try `help`");
            prompt_marker()?;
            continue;
        };

        match action {
            Action::Quit => break,
            Action::Help => print_help(),
            Action::Show => print_table(&store.view()),
            Action::Refresh => match store.refresh(true).await {
                Ok(()) => print_table(&store.view()),
                Err(err) => println!("could not refresh: {err}"),
            },
            Action::Ping => match store.api().ping().await {
                Ok(true) => println!("backend is awake"),
                Ok(false) => println!("backend answered but reported a problem"),
                Err(err) => println!("could not reach the backend: {err}"),
            },
            Action::Search(keyword) => {
                store.set_keyword(&keyword);
                print_table(&store.view());
            }
            Action::Next => {
                if store.next_page() {
                    print_table(&store.view());
                } else {
                    println!("already on the last page");
                }
            }
            Action::Prev => {
                if store.prev_page() {
                    print_table(&store.view());
                } else {
                    println!("already on the first page");
                }
            }
            Action::Page(target) => {
                if store.set_page(target) {
                    print_table(&store.view());
                } else {
                    println!("no page {target}");
                }
            }
            Action::Add => {
                let draft = read_draft(&mut lines, None).await?;
                match store.create(draft).await {
                    Ok(()) => {
                        println!("catch logged");
                        print_table(&store.view());
                    }
                    Err(err) => println!("could not log the catch: {err}"),
                }
            }
            Action::Edit(id) => {
                let Some(current) = store.all().iter().find(|catch| catch.id == id).cloned()
                else {
                    println!("no catch with id {id}");
                    prompt_marker()?;
                    continue;
                };
                let draft = read_draft(&mut lines, Some(&current)).await?;
                match store.update(id, draft).await {
                    Ok(()) => {
                        println!("catch {id} updated");
                        print_table(&store.view());
                    }
                    Err(err) => println!("could not update catch {id}: {err}"),
                }
            }
            Action::Delete(id) => match store.delete(id).await {
                Ok(()) => {
                    println!("catch {id} deleted");
                    print_table(&store.view());
                }
                Err(err) => println!("could not delete catch {id}: {err}"),
            },
            Action::Chart(kind) => print_chart(&store.chart(kind)),
        }

        prompt_marker()?;
    }

    Ok(())
}

fn prompt_marker() -> Result<()> {
    print!("> ");
    std::io::stdout().flush()?;
    Ok(())
}

async fn prompt(lines: &mut InputLines, label: &str) -> Result<String> {
    print!("  {label}: ");
    std::io::stdout().flush()?;

    // EOF mid-draft reads as a blank answer; the outer loop ends right after
    Ok(lines
        .next_line()
        .await?
        .unwrap_or_default()
        .trim()
        .to_string())
}

/// Prompt for every draft field. Blank answers keep the current value when
/// editing and leave the field empty when adding; date and time are blank by
/// default and filled with "today"/"now" at submission.
async fn read_draft(lines: &mut InputLines, current: Option<&Catch>) -> Result<CatchDraft> {
    let mut draft = current.map(CatchDraft::from).unwrap_or_default();

    let date = prompt(lines, &labeled("date (M/D/YYYY)", draft.date.as_deref())).await?;
    if !date.is_empty() {
        match normalize_date_input(&date) {
            Some(iso) => draft.date = Some(iso),
            None => println!("  could not read {date:?} as a date, keeping the old value"),
        }
    }

    let time = prompt(lines, &labeled("time (h:MM AM/PM)", draft.time.as_deref())).await?;
    if !time.is_empty() {
        match normalize_time_input(&time) {
            Some(normalized) => draft.time = Some(normalized),
            None => println!("  could not read {time:?} as a time, keeping the old value"),
        }
    }

    read_text(lines, "location", &mut draft.location).await?;
    read_text(lines, "species", &mut draft.species).await?;
    read_number(lines, "length (in)", &mut draft.length_in).await?;
    read_number(lines, "weight (lbs)", &mut draft.weight_lbs).await?;
    read_number(lines, "temperature", &mut draft.temperature).await?;
    read_text(lines, "bait", &mut draft.bait).await?;

    Ok(draft)
}

async fn read_text(lines: &mut InputLines, label: &str, field: &mut Option<String>) -> Result<()> {
    let input = prompt(lines, &labeled(label, field.as_deref())).await?;
    if !input.is_empty() {
        *field = Some(input);
    }
    Ok(())
}

async fn read_number(lines: &mut InputLines, label: &str, field: &mut Option<f64>) -> Result<()> {
    let shown = field.map(|value| value.to_string());
    let input = prompt(lines, &labeled(label, shown.as_deref())).await?;
    if input.is_empty() {
        return Ok(());
    }

    match input.parse::<f64>() {
        Ok(value) => *field = Some(value),
        Err(_) => println!("  {input:?} is not a number, keeping the old value"),
    }
    Ok(())
}

fn labeled(label: &str, current: Option<&str>) -> String {
    match current {
        Some(current) if !current.is_empty() => format!("{label} [{current}]"),
        _ => label.to_string(),
    }
}

fn print_table(view: &TableView<'_>) {
    if view.total == 0 {
        println!("no catches logged yet");
        return;
    }
    if view.page_count == 0 {
        println!("no catches match the search");
        return;
    }

    println!(
        "{:>5}  {:<10}  {:<8}  {:<16}  {:<12}  {:>7}  {:>7}  {:>5}  {:<12}",
        "id", "date", "time", "location", "species", "len in", "wt lbs", "temp", "bait"
    );
    for catch in view.rows {
        println!(
            "{:>5}  {:<10}  {:<8}  {:<16}  {:<12}  {:>7}  {:>7}  {:>5}  {:<12}",
            catch.id,
            catch.formatted_date(),
            catch.formatted_time(),
            text(&catch.location),
            text(&catch.species),
            number(catch.length_in),
            number(catch.weight_lbs),
            number(catch.temperature),
            text(&catch.bait),
        );
    }
    println!(
        "page {} of {} ({} matching, {} total)",
        view.page, view.page_count, view.filtered_total, view.total
    );
}

fn print_chart(data: &ChartData) {
    match data {
        ChartData::Counts(series) => {
            if series.is_empty() {
                println!("no data to chart yet");
                return;
            }
            for (label, count) in series.labels.iter().zip(&series.counts) {
                println!("{label:<24} {count}");
            }
        }
        ChartData::Values(series) => {
            if series.is_empty() {
                println!("no data to chart yet");
                return;
            }
            for (label, value) in series.labels.iter().zip(&series.values) {
                println!("{label:<24} {value:.2}");
            }
        }
    }
}

fn print_help() {
    println!("commands:");
    println!("  show               print the current table page");
    println!("  search <keyword>   filter the table; blank keyword clears");
    println!("  next / prev        page through the table");
    println!("  page <n>           jump straight to a page");
    println!("  add                log a new catch (prompts for each field)");
    println!("  edit <id>          edit a catch; blank answers keep old values");
    println!("  delete <id>        delete a catch");
    println!("  chart <name>       species | time | weight | bait | length");
    println!("  refresh            reload from the backend");
    println!("  ping               check that the backend is awake");
    println!("  quit               leave");
}

fn text(field: &Option<String>) -> String {
    field.clone().unwrap_or_default()
}

fn number(field: Option<f64>) -> String {
    field.map(|value| value.to_string()).unwrap_or_default()
}
