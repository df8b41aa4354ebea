use anyhow::{Context, Result, bail};
use clap::{ArgAction, Parser, Subcommand};
use rust_decimal::Decimal;

use fieldquote_auth::{Credentials, Session, SessionGate};
use fieldquote_catalog::{CatalogItem, CatalogStore};
use fieldquote_core::money::{format_amount, parse_amount};
use fieldquote_core::{CatalogItemId, CustomerId, MaterialLineId};
use fieldquote_infra::{RestPersistence, RestSessionGate, StoreConfig};
use fieldquote_observability::LogFormat;
use fieldquote_quotes::{
    CustomerRecord, LineInput, MutationOutcome, NewCustomer, Priced, QuoteEngine, QuoteSheet,
    filter_customers, filter_items, parse_install_date,
};

#[derive(Parser)]
#[command(
    name = "fieldquote",
    about = "Customers, material quotes and procurement status",
    version
)]
struct Cli {
    #[arg(long, global = true, help = "Render command output as pretty JSON")]
    json: bool,

    #[arg(long, global = true, help = "Human-readable logs instead of JSON")]
    plain_logs: bool,

    #[arg(long, env = "FIELDQUOTE_EMAIL", hide_env_values = true)]
    email: String,

    #[arg(long, env = "FIELDQUOTE_PASSWORD", hide_env_values = true)]
    password: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List customers, newest first.
    Customers {
        /// Case-insensitive match on name or phone.
        #[arg(long, short)]
        query: Option<String>,
    },
    /// Show one customer's material lines and order total.
    Show { customer: CustomerId },
    /// Create a customer with its initial material lines.
    New {
        name: String,
        #[arg(long = "customer-email")]
        email: Option<String>,
        #[arg(long)]
        phone: Option<String>,
        #[arg(long)]
        address: Option<String>,
        /// Installation date, YYYY-MM-DD.
        #[arg(long)]
        install_date: Option<String>,
        /// Material line as ITEM[:QTY[:UNIT_PRICE]]; repeat for more lines.
        #[arg(long = "line", value_parser = parse_line_arg)]
        lines: Vec<LineInput>,
    },
    /// List catalog items by name.
    Items {
        #[arg(long, short)]
        query: Option<String>,
    },
    /// Manage the catalog of standard items.
    Item {
        #[command(subcommand)]
        action: ItemCommand,
    },
    /// Mark a material line as ordered (true) or pending (false).
    Toggle {
        customer: CustomerId,
        line: MaterialLineId,
        #[arg(action = ArgAction::Set)]
        ordered: bool,
    },
    /// Set the installation date (YYYY-MM-DD); omit the date to clear it.
    Schedule {
        customer: CustomerId,
        date: Option<String>,
    },
}

#[derive(Subcommand)]
enum ItemCommand {
    /// Add an item; a missing price is stored as zero.
    Add {
        name: String,
        #[arg(value_parser = parse_price_arg)]
        price: Option<Decimal>,
    },
    /// Change an item's unit price. Existing material lines keep theirs.
    Price {
        item: CatalogItemId,
        #[arg(value_parser = parse_price_arg, allow_hyphen_values = true)]
        price: Decimal,
    },
    /// Delete an item.
    Remove { item: CatalogItemId },
}

struct CliContext {
    session: Session,
    store: RestPersistence,
}

impl CliContext {
    async fn initialize(cli: &Cli) -> Result<Self> {
        let config = StoreConfig::from_env().context("store configuration")?;
        let gate = RestSessionGate::new(&config)?;
        let session = gate
            .sign_in(&Credentials::new(&cli.email, &cli.password))
            .await
            .context("failed to sign in")?;
        let store = RestPersistence::new(&config)?.with_token(session.access_token());
        Ok(Self { session, store })
    }

    fn engine(&self) -> QuoteEngine<RestPersistence> {
        QuoteEngine::new(self.store.clone())
    }

    fn catalog(&self) -> CatalogStore<RestPersistence> {
        CatalogStore::new(self.store.clone())
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    fieldquote_observability::tracing::init(if cli.plain_logs {
        LogFormat::Compact
    } else {
        LogFormat::Json
    });

    let context = CliContext::initialize(&cli).await?;
    let session = &context.session;

    match cli.command {
        Commands::Customers { ref query } => {
            let customers = context.engine().list_customers(session).await?;
            let shown = filter_customers(&customers, query.as_deref().unwrap_or_default());
            if cli.json {
                print_json(&shown)?;
            } else {
                print!("{}", render_customers(&shown));
            }
        }
        Commands::Show { customer } => {
            let sheet = context.engine().load_customer(session, customer).await?;
            if cli.json {
                print_json(&sheet_json(&sheet))?;
            } else {
                print!("{}", render_sheet(&sheet));
            }
        }
        Commands::New {
            ref name,
            ref email,
            ref phone,
            ref address,
            ref install_date,
            ref lines,
        } => {
            let mut input = NewCustomer::new(name.as_str());
            if let Some(email) = email {
                input = input.with_email(email.as_str());
            }
            if let Some(phone) = phone {
                input = input.with_phone(phone.as_str());
            }
            if let Some(address) = address {
                input = input.with_address(address.as_str());
            }
            if let Some(date) = parse_install_date(install_date.as_deref().unwrap_or_default())? {
                input = input.with_install_date(date);
            }
            let created = context
                .engine()
                .create_customer(session, input, lines.clone())
                .await?;
            let sheet = created.into_sheet();
            if cli.json {
                print_json(&sheet_json(&sheet))?;
            } else {
                print!("{}", render_sheet(&sheet));
            }
        }
        Commands::Items { ref query } => {
            let items = context.catalog().list(session).await?;
            let shown = filter_items(&items, query.as_deref().unwrap_or_default());
            if cli.json {
                print_json(&shown)?;
            } else {
                print!("{}", render_items(&shown));
            }
        }
        Commands::Item { ref action } => {
            let catalog = context.catalog();
            match *action {
                ItemCommand::Add { ref name, price } => {
                    let item = catalog.add(session, name, price).await?;
                    print_item(&item, cli.json)?;
                }
                ItemCommand::Price { item, price } => {
                    let item = catalog.update_price(session, item, price).await?;
                    print_item(&item, cli.json)?;
                }
                ItemCommand::Remove { item } => {
                    catalog.remove(session, item).await?;
                    println!("item {item} removed");
                }
            }
        }
        Commands::Toggle {
            customer,
            line,
            ordered,
        } => {
            let engine = context.engine();
            let mut sheet = engine.load_customer(session, customer).await?;
            let outcome = engine.toggle_ordered(session, &mut sheet, line, ordered).await?;
            if let MutationOutcome::Failed { pending, reason } = outcome {
                sheet.rollback(&pending);
                bail!("line {line} was not updated: {reason}");
            }
            tracing::debug!(customer_id = %customer, line_id = %line, ordered, "toggle confirmed");
            print!("{}", render_sheet(&sheet));
        }
        Commands::Schedule { customer, ref date } => {
            let date = parse_install_date(date.as_deref().unwrap_or_default())?;
            let updated = context
                .engine()
                .set_install_date(session, None, customer, date)
                .await?;
            if cli.json {
                print_json(&updated)?;
            } else {
                println!("{}: {}", updated.name, install_label(&updated));
            }
        }
    }

    Ok(())
}

fn print_json<T: serde::Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn print_item(item: &CatalogItem, json: bool) -> Result<()> {
    if json {
        print_json(item)
    } else {
        print!("{}", render_items(&[item]));
        Ok(())
    }
}

/// `ITEM[:QTY[:UNIT_PRICE]]`; blank or malformed amounts fall back to the line defaults.
fn parse_line_arg(arg: &str) -> Result<LineInput, String> {
    let mut parts = arg.splitn(3, ':');
    let item = parts.next().unwrap_or_default().trim();
    if item.is_empty() {
        return Err("material line needs an item name".to_string());
    }
    Ok(LineInput {
        item: item.to_string(),
        qty: parts.next().and_then(parse_amount),
        unit_price: parts.next().and_then(parse_amount),
    })
}

fn parse_price_arg(arg: &str) -> Result<Decimal, String> {
    parse_amount(arg).ok_or_else(|| format!("'{arg}' is not an amount"))
}

fn install_label(customer: &CustomerRecord) -> String {
    customer
        .install_date
        .map(|d| d.format("%Y-%m-%d").to_string())
        .unwrap_or_else(|| "not scheduled".to_string())
}

fn render_customers(customers: &[&CustomerRecord]) -> String {
    let mut out = String::new();
    for c in customers {
        out.push_str(&format!(
            "{:>6}  {:<28} {:<14} {}\n",
            c.id,
            c.name,
            c.phone.as_deref().unwrap_or("-"),
            install_label(c)
        ));
    }
    out
}

fn render_items(items: &[&CatalogItem]) -> String {
    items
        .iter()
        .map(|i| format!("{:>6}  {:<32} {:>10}\n", i.id, i.name, format_amount(i.unit_price)))
        .collect()
}

fn render_sheet(sheet: &QuoteSheet) -> String {
    let customer = sheet.customer();
    let mut out = format!(
        "{} (#{}), install: {}\n",
        customer.name,
        customer.id,
        install_label(customer)
    );
    for tracked in sheet.lines() {
        let line = tracked.line();
        out.push_str(&format!(
            "{:>6}  [{}] {:<28} {:>8} x {:>10} = {:>10}\n",
            line.line_id(),
            if line.is_ordered() { "x" } else { " " },
            line.item(),
            line.qty(),
            format_amount(line.unit_price()),
            format_amount(line.line_total()),
        ));
    }
    out.push_str(&format!("Total: {}\n", format_amount(sheet.total())));
    out
}

fn sheet_json(sheet: &QuoteSheet) -> serde_json::Value {
    let lines: Vec<_> = sheet
        .material_lines()
        .map(|line| {
            serde_json::json!({
                "line": line,
                "line_total": format_amount(line.line_total()),
            })
        })
        .collect();
    serde_json::json!({
        "customer": sheet.customer(),
        "lines": lines,
        "total": format_amount(sheet.total()),
    })
}
