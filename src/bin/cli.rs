use std::env;
use std::fs;
use std::io::{self, Write};
use std::path::Path;

use chrono::NaiveDate;
use datatrace::codec::frame_from_grid;
use datatrace::config::{CONFIG_ENV, load_config};
use datatrace::style::{PaletteKind, StyleConfig};
use datatrace::{Granularity, OutputFormat, Session, SessionError, TableFormat};
use polars::prelude::{AnyValue, DataFrame};
use tracing_subscriber::EnvFilter;

fn cell_text(av: &AnyValue) -> String {
    match av {
        AnyValue::Null => String::new(),
        AnyValue::Float64(v) => format!("{v}"),
        AnyValue::String(s) => s.to_string(),
        AnyValue::StringOwned(s) => s.to_string(),
        _ => av.to_string(),
    }
}

fn render_df_as_text_table(df: &DataFrame) -> String {
    // Widths count chars, not bytes, so CJK headers line up
    let columns = df.get_columns();
    let col_names: Vec<String> = columns.iter().map(|c| c.name().to_string()).collect();

    let mut widths: Vec<usize> = col_names.iter().map(|n| n.chars().count()).collect();
    for (ci, col) in columns.iter().enumerate() {
        for row_idx in 0..df.height() {
            if let Ok(ref av) = col.get(row_idx) {
                let len = cell_text(av).chars().count();
                if len > widths[ci] {
                    widths[ci] = len;
                }
            }
        }
    }

    let mut sep = String::new();
    sep.push('+');
    for w in &widths {
        sep.push_str(&"-".repeat(*w + 2));
        sep.push('+');
    }

    let mut out = String::new();
    out.push_str(&sep);
    out.push('\n');

    out.push('|');
    for (i, name) in col_names.iter().enumerate() {
        out.push(' ');
        out.push_str(name);
        let pad = widths[i] - name.chars().count();
        if pad > 0 { out.push_str(&" ".repeat(pad)); }
        out.push(' ');
        out.push('|');
    }
    out.push('\n');
    out.push_str(&sep);
    out.push('\n');

    for row_idx in 0..df.height() {
        out.push('|');
        for (ci, col) in columns.iter().enumerate() {
            let s = col.get(row_idx).map(|av| cell_text(&av)).unwrap_or_default();
            out.push(' ');
            out.push_str(&s);
            let pad = widths[ci].saturating_sub(s.chars().count());
            if pad > 0 { out.push_str(&" ".repeat(pad)); }
            out.push(' ');
            out.push('|');
        }
        out.push('\n');
    }

    out.push_str(&sep);
    out.push('\n');
    out
}

fn show(session: &Session) -> String {
    let time_points = session.time_points();
    match frame_from_grid(session.grid(), session.items(), &time_points) {
        Ok(df) => render_df_as_text_table(&df),
        Err(e) => format!("Error: {}", e),
    }
}

fn print_help() {
    println!(
        "Commands:\n  help                               Show this help\n  show                               Show scores and notes\n  points                             List time points\n  items                              List questions with their colours\n  range show                         Show the time range\n  range <start> <end> <granularity>  Set range (YYYY-MM-DD, quarter|month|year)\n  add [name...]                      Append a question (default 题项N)\n  delete <n>                         Delete question n\n  rename <n> <name...>               Rename question n\n  score <n> <timepoint> <value>      Set score (0-100)\n  note  <n> <timepoint> <text...>    Set note (rest of line)\n  palette show                       Show palette and colours\n  palette default                    Use the built-in palette\n  palette custom <#hex,...>          Use custom colours\n  layout <ncol> <nrow>               Set layout counts\n  font <path>                        Use a font file for charts\n  export <path>                      Write .xlsx or .csv\n  import <path>                      Merge an .xlsx or .csv file\n  render <path> [dpi]                Write a .png or .jpg chart\n  config show                        Print the configuration as JSON\n  config load <path>                 Load a JSON configuration\n  quit|exit                          Exit\n\nQuestions are numbered from 1."
    );
}

fn parse_index(s: &str) -> Option<usize> {
    s.parse::<usize>().ok().filter(|n| *n >= 1).map(|n| n - 1)
}

fn parse_date(s: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").ok()
}

fn item_name(session: &Session, s: &str) -> Option<String> {
    parse_index(s).and_then(|i| session.items().get(i).cloned())
}

fn print_items(session: &Session) {
    for (i, (item, color)) in session.items().iter().zip(session.item_colors()).enumerate() {
        println!("{:>3}. {} ({})", i + 1, item, color);
    }
}

fn print_range(session: &Session) {
    let tc = session.time_config();
    println!(
        "{} .. {} ({}), {} time points",
        tc.start_date,
        tc.end_date,
        tc.granularity,
        session.time_points().len()
    );
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .try_init();
}

fn initial_session() -> Session {
    let Ok(path) = env::var(CONFIG_ENV) else {
        return Session::new();
    };
    let loaded = match load_config(&path) {
        Ok(config) => Session::from_config(&config).map_err(|e| e.to_string()),
        Err(e) => Err(e.to_string()),
    };
    match loaded {
        Ok(session) => {
            println!("Loaded config from {}", path);
            session
        }
        Err(e) => {
            println!("Config error: {}", e);
            Session::new()
        }
    }
}

fn main() {
    init_tracing();
    let mut session = initial_session();

    println!("MyDataTrace (CLI) - type 'help' for commands\n");
    print_range(&session);
    println!("{}", show(&session));

    let stdin = io::stdin();
    let mut line = String::new();
    loop {
        print!("> ");
        let _ = io::stdout().flush();
        line.clear();
        match stdin.read_line(&mut line) {
            Ok(0) | Err(_) => break,
            Ok(_) => {}
        }
        let input = line.trim();
        if input.is_empty() { continue; }

        let mut parts = input.split_whitespace();
        let cmd = parts.next().unwrap_or("");

        // Every mutation yields the next session; on error the current one stays.
        let next = match cmd {
            "help" => {
                print_help();
                None
            }
            "quit" | "exit" => break,
            "show" => {
                println!("{}", show(&session));
                None
            }
            "points" => {
                println!("{}", session.time_points().join(" "));
                None
            }
            "items" => {
                print_items(&session);
                None
            }
            "range" => match (parts.next(), parts.next(), parts.next()) {
                (Some("show"), None, None) => {
                    print_range(&session);
                    None
                }
                (Some(start_s), Some(end_s), Some(gran_s)) => {
                    let start = match parse_date(start_s) { Some(d) => d, None => { println!("Invalid start date (YYYY-MM-DD)"); continue; } };
                    let end = match parse_date(end_s) { Some(d) => d, None => { println!("Invalid end date (YYYY-MM-DD)"); continue; } };
                    let granularity: Granularity = match gran_s.parse() { Ok(g) => g, Err(e) => { println!("Error: {}", e); continue; } };
                    Some(session.set_range(start, end, granularity))
                }
                _ => {
                    println!("Usage: range show | range <start> <end> <quarter|month|year>");
                    None
                }
            },
            "add" => {
                let rest: Vec<&str> = parts.collect();
                let name = rest.join(" ");
                let name = if name.is_empty() { None } else { Some(name.as_str()) };
                Some(session.add_question(name))
            }
            "delete" => match parts.next().and_then(parse_index) {
                Some(idx) => Some(session.delete_question(idx)),
                None => {
                    println!("Usage: delete <n>");
                    None
                }
            },
            "rename" => {
                let idx = parts.next().and_then(parse_index);
                let rest: Vec<&str> = parts.collect();
                match (idx, !rest.is_empty()) {
                    (Some(idx), true) => Some(session.rename_question(idx, &rest.join(" "))),
                    _ => {
                        println!("Usage: rename <n> <name...>");
                        None
                    }
                }
            }
            "score" => match (parts.next(), parts.next(), parts.next()) {
                (Some(n_s), Some(tp), Some(val_s)) => {
                    let item = match item_name(&session, n_s) { Some(i) => i, None => { println!("Invalid question number"); continue; } };
                    let val: f64 = match val_s.parse() { Ok(v) => v, Err(_) => { println!("Invalid score"); continue; } };
                    Some(session.update_score(&item, tp, val))
                }
                _ => {
                    println!("Usage: score <n> <timepoint> <value>");
                    None
                }
            },
            "note" => {
                let n_s = parts.next();
                let tp = parts.next();
                let rest: Vec<&str> = parts.collect();
                match (n_s, tp) {
                    (Some(n_s), Some(tp)) => {
                        let item = match item_name(&session, n_s) { Some(i) => i, None => { println!("Invalid question number"); continue; } };
                        Some(session.update_note(&item, tp, &rest.join(" ")))
                    }
                    _ => {
                        println!("Usage: note <n> <timepoint> <text...>");
                        None
                    }
                }
            }
            "palette" => match parts.next() {
                Some("show") | None => {
                    println!("palette: {}", session.style().color_palette);
                    println!("custom: {}", session.style().custom_colors.join(","));
                    print_items(&session);
                    None
                }
                Some(kind_s) => {
                    let kind: PaletteKind = match kind_s.parse() { Ok(k) => k, Err(e) => { println!("Error: {}", e); continue; } };
                    let mut style: StyleConfig = session.style().clone();
                    style.color_palette = kind;
                    if let Some(list) = parts.next() {
                        style.custom_colors = list
                            .split(',')
                            .map(|c| c.trim().to_string())
                            .filter(|c| !c.is_empty())
                            .collect();
                    }
                    Some(session.set_style(style))
                }
            },
            "layout" => match (parts.next(), parts.next()) {
                (Some(ncol_s), Some(nrow_s)) => {
                    let ncol: u32 = match ncol_s.parse() { Ok(v) => v, Err(_) => { println!("Invalid ncol"); continue; } };
                    let nrow: u32 = match nrow_s.parse() { Ok(v) => v, Err(_) => { println!("Invalid nrow"); continue; } };
                    let mut style = session.style().clone();
                    style.ncol = ncol;
                    style.nrow = nrow;
                    Some(session.set_style(style))
                }
                _ => {
                    println!("Usage: layout <ncol> <nrow>");
                    None
                }
            },
            "font" => match parts.next() {
                Some(path) => {
                    let mut style = session.style().clone();
                    style.font_path = Some(path.into());
                    Some(session.set_style(style))
                }
                None => {
                    println!("Usage: font <path>");
                    None
                }
            },
            "export" => {
                match parts.next() {
                    Some(path) => {
                        let res = TableFormat::from_path(Path::new(path))
                            .map_err(SessionError::from)
                            .and_then(|format| session.export_table(format));
                        match res {
                            Ok(bytes) => match fs::write(path, &bytes) {
                                Ok(_) => println!("Exported {} bytes to {}", bytes.len(), path),
                                Err(e) => println!("Error: {}", e),
                            },
                            Err(e) => println!("Error: {}", e),
                        }
                    }
                    None => println!("Usage: export <path>"),
                }
                None
            }
            "import" => match parts.next() {
                Some(path) => {
                    let format = match TableFormat::from_path(Path::new(path)) { Ok(f) => f, Err(e) => { println!("Error: {}", e); continue; } };
                    let bytes = match fs::read(path) { Ok(b) => b, Err(e) => { println!("Error: {}", e); continue; } };
                    Some(session.import_table(&bytes, format))
                }
                None => {
                    println!("Usage: import <path>");
                    None
                }
            },
            "render" => {
                match (parts.next(), parts.next()) {
                    (Some(path), dpi_s) => {
                        let ext = Path::new(path).extension().and_then(|e| e.to_str()).unwrap_or("png");
                        let format: OutputFormat = match ext.parse() { Ok(f) => f, Err(e) => { println!("Error: {}", e); continue; } };
                        let dpi: u32 = match dpi_s.map(str::parse::<u32>).transpose() { Ok(v) => v.unwrap_or(datatrace::chart::DEFAULT_DPI), Err(_) => { println!("Invalid dpi"); continue; } };
                        let options = session.chart_options(format, dpi);
                        match session.render_chart(&options) {
                            Ok(bytes) => match fs::write(path, &bytes) {
                                Ok(_) => println!("Rendered {} bytes to {}", bytes.len(), path),
                                Err(e) => println!("Error: {}", e),
                            },
                            Err(e) => println!("Error: {}", e),
                        }
                    }
                    _ => println!("Usage: render <path> [dpi]"),
                }
                None
            }
            "config" => match (parts.next(), parts.next()) {
                (Some("show"), _) => {
                    match session.config().to_json_pretty() {
                        Ok(json) => println!("{}", json),
                        Err(e) => println!("Error: {}", e),
                    }
                    None
                }
                (Some("load"), Some(path)) => match load_config(path) {
                    Ok(config) => Some(session.apply_config(&config)),
                    Err(e) => {
                        println!("Config error: {}", e);
                        None
                    }
                },
                _ => {
                    println!("Usage: config show | config load <path>");
                    None
                }
            },
            _ => {
                println!("Unknown command. Type 'help'.");
                None
            }
        };

        match next {
            Some(Ok(updated)) => {
                session = updated;
                println!("{} ok.", cmd);
            }
            Some(Err(e)) => println!("Error: {}", e),
            None => {}
        }
    }
}
