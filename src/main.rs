use std::io::{self, BufRead, Write};
use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use chrono::{NaiveDate, Utc};
use clap::{Parser, Subcommand};
use slit_planner::config::Config;
use slit_planner::render;
use slit_planner::store::ThemeMode;
use slit_planner::{Order, PlanMode, RawMaterialRoll, Workshop, logging};

#[derive(Parser)]
#[command(
    name = "slit_planner",
    about = "Roll slitting planner: fit customer orders onto master rolls"
)]
struct Cli {
    /// Directory holding the inventory and order records
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Blade kerf width in mm
    #[arg(long, global = true)]
    kerf: Option<f64>,

    /// Trim margin per roll edge in mm
    #[arg(long, global = true)]
    trim: Option<f64>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Replace all records with the demo data set
    Seed,
    /// Inventory maintenance
    #[command(subcommand)]
    Rolls(RollCommand),
    /// Order intake
    #[command(subcommand)]
    Orders(OrderCommand),
    /// Compute a cutting plan without applying it
    Plan(PlanArgs),
    /// Compute a cutting plan and apply it after confirmation
    Execute {
        #[command(flatten)]
        plan: PlanArgs,
        /// Skip the confirmation prompt
        #[arg(long)]
        yes: bool,
    },
    /// Inventory and order overview
    Dashboard,
    /// Show or change the display theme preference
    Theme {
        /// light, dark or toggle
        #[arg(value_parser = parse_theme_choice)]
        choice: Option<ThemeChoice>,
    },
}

#[derive(Subcommand)]
enum RollCommand {
    /// List rolls, optionally matching width or weight text
    List {
        #[arg(long, default_value = "")]
        query: String,
    },
    /// Add an original-stock roll
    Add {
        #[arg(long)]
        batch: String,
        /// Width in mm
        #[arg(long)]
        width: f64,
        /// Weight in kg
        #[arg(long)]
        weight: f64,
        #[arg(long)]
        material: String,
    },
    /// Correct a roll's width and weight
    Update {
        id: String,
        #[arg(long)]
        width: f64,
        #[arg(long)]
        weight: f64,
    },
    /// Delete a roll
    Remove { id: String },
}

#[derive(Subcommand)]
enum OrderCommand {
    /// List pending orders
    List {
        /// Include fulfilled orders
        #[arg(long)]
        all: bool,
    },
    /// Add a customer order
    Add {
        #[arg(long)]
        customer: String,
        /// Required strip width in mm
        #[arg(long)]
        width: f64,
        /// Target weight in kg
        #[arg(long)]
        weight: f64,
        /// Due date, YYYY-MM-DD
        #[arg(long)]
        due: NaiveDate,
    },
}

#[derive(clap::Args)]
struct PlanArgs {
    /// Roll to cut; the most efficient eligible roll when omitted
    #[arg(long)]
    roll: Option<String>,

    /// Only consider rolls of this material type
    #[arg(long)]
    material: Option<String>,

    /// Greedy fill instead of exact search
    #[arg(long)]
    approximate: bool,

    /// Show an ASCII cross-section of the roll
    #[arg(long)]
    layout: bool,
}

#[derive(Clone, Copy)]
enum ThemeChoice {
    Set(ThemeMode),
    Toggle,
}

fn parse_theme_choice(s: &str) -> Result<ThemeChoice, String> {
    match s {
        "light" => Ok(ThemeChoice::Set(ThemeMode::Light)),
        "dark" => Ok(ThemeChoice::Set(ThemeMode::Dark)),
        "toggle" => Ok(ThemeChoice::Toggle),
        _ => Err(format!(
            "invalid theme '{}', expected: light, dark, or toggle",
            s
        )),
    }
}

fn open_workshop(cli: &Cli, approximate: bool) -> Result<Workshop> {
    let mut config = Config::from_env()?;
    if let Some(dir) = &cli.data_dir {
        config.data_dir = dir.clone();
    }
    if let Some(kerf) = cli.kerf {
        config.kerf_mm = kerf;
    }
    if let Some(trim) = cli.trim {
        config.trim_margin_mm = trim;
    }
    config.validate()?;

    let mode = if approximate {
        PlanMode::Approximate
    } else {
        PlanMode::Exact
    };
    Ok(Workshop::open(
        config.storage(),
        config.planner().with_mode(mode),
        config.executor(),
    ))
}

fn warn_unsaved(persisted: bool) {
    if !persisted {
        eprintln!("Warning: changes could not be saved and may not survive a restart");
    }
}

fn confirm(prompt: &str) -> Result<bool> {
    print!("{prompt}\n[y/N] ");
    io::stdout().flush()?;
    let mut answer = String::new();
    io::stdin()
        .lock()
        .read_line(&mut answer)
        .context("failed to read confirmation")?;
    Ok(matches!(answer.trim(), "y" | "Y" | "yes"))
}

fn print_plan(workshop: &Workshop, args: &PlanArgs) -> Result<Option<slit_planner::OptimizationPlan>> {
    let plan = match workshop.plan(args.roll.as_deref(), args.material.as_deref()) {
        Ok(plan) => plan,
        Err(e) => {
            eprintln!("No plan: {e}");
            return Ok(None);
        }
    };

    println!("Roll {}:", plan.selected_roll);
    for (order, strip) in plan.cuts.iter().zip(&plan.strips) {
        println!("  {} @ {}..{}mm", order, strip.start, strip.end);
    }
    let positions: Vec<String> = plan.blade_positions.iter().map(|p| p.to_string()).collect();
    println!("  blades at [{}]", positions.join(", "));
    if args.layout {
        print!("{}", render::render_plan(&plan));
    }
    println!();
    println!("Summary: {plan}");
    Ok(Some(plan))
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init("warn");

    match &cli.command {
        Command::Seed => {
            let mut workshop = open_workshop(&cli, false)?;
            let persisted = workshop.seed();
            warn_unsaved(persisted);
            println!(
                "Seeded {} rolls and {} orders",
                workshop.rolls().len(),
                workshop.orders().len()
            );
        }
        Command::Rolls(cmd) => {
            let mut workshop = open_workshop(&cli, false)?;
            match cmd {
                RollCommand::List { query } => {
                    for roll in workshop.search_rolls(query) {
                        println!("{roll}");
                    }
                }
                RollCommand::Add {
                    batch,
                    width,
                    weight,
                    material,
                } => {
                    let roll = RawMaterialRoll::new(batch.as_str(), *width, *weight, material.as_str())?;
                    let committed = workshop.add_roll(roll)?;
                    warn_unsaved(committed.persisted);
                    println!("Added {}", committed.value);
                }
                RollCommand::Update { id, width, weight } => {
                    let committed = workshop.update_roll(id, *width, *weight)?;
                    warn_unsaved(committed.persisted);
                    println!("Updated {}", committed.value);
                }
                RollCommand::Remove { id } => {
                    if !confirm(&format!("Delete roll {id}?"))? {
                        bail!("cancelled");
                    }
                    let committed = workshop.remove_roll(id)?;
                    warn_unsaved(committed.persisted);
                    println!("Removed {}", committed.value);
                }
            }
        }
        Command::Orders(cmd) => {
            let mut workshop = open_workshop(&cli, false)?;
            match cmd {
                OrderCommand::List { all } => {
                    let orders: Vec<&Order> = if *all {
                        workshop.orders().iter().collect()
                    } else {
                        workshop.pending_orders()
                    };
                    for order in orders {
                        let mark = if order.is_fulfilled { " [done]" } else { "" };
                        println!("{order}{mark}");
                    }
                }
                OrderCommand::Add {
                    customer,
                    width,
                    weight,
                    due,
                } => {
                    let order = Order::new(customer.as_str(), *width, *weight, *due)?;
                    let committed = workshop.add_order(order)?;
                    warn_unsaved(committed.persisted);
                    println!("Added {}", committed.value);
                }
            }
        }
        Command::Plan(args) => {
            let workshop = open_workshop(&cli, args.approximate)?;
            if print_plan(&workshop, args)?.is_none() {
                std::process::exit(1);
            }
        }
        Command::Execute { plan: args, yes } => {
            let mut workshop = open_workshop(&cli, args.approximate)?;
            let Some(plan) = print_plan(&workshop, args)? else {
                std::process::exit(1);
            };
            if !*yes && !confirm(&workshop.preview(&plan))? {
                println!("Cancelled, nothing changed.");
                return Ok(());
            }
            let committed = workshop.execute(&plan)?;
            warn_unsaved(committed.persisted);
            println!("SUCCESS!\n{}", committed.value);
        }
        Command::Dashboard => {
            let workshop = open_workshop(&cli, false)?;
            println!("{}", workshop.dashboard(Utc::now().date_naive()));
        }
        Command::Theme { choice } => {
            let workshop = open_workshop(&cli, false)?;
            let theme = match choice {
                None => workshop.theme(),
                Some(choice) => {
                    let theme = match choice {
                        ThemeChoice::Set(theme) => *theme,
                        ThemeChoice::Toggle => workshop.theme().toggled(),
                    };
                    let committed = workshop.set_theme(theme);
                    warn_unsaved(committed.persisted);
                    committed.value
                }
            };
            println!("{theme}");
        }
    }
    Ok(())
}
