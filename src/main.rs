use std::fs::File;

use anyhow::Context;
use clap::Parser;
use rust_decimal::Decimal;

use ride_orders::engine::LifecycleManager;
use ride_orders::output;
use ride_orders::parsing;
use ride_orders::policy::BonusPolicy;

fn main() -> anyhow::Result<()> {
    let args = Arguments::parse();
    if let Some(log_level) = args.log_level {
        tracing_subscriber::fmt()
            .with_max_level(log_level)
            .with_writer(std::io::stderr)
            .init();
    }

    let file = File::open(&args.input_file)
        .with_context(|| format!("failed to open {}", args.input_file))?;

    let mut rdr = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(file);

    let commands = parsing::deserialize_csv(&mut rdr);

    let policy = BonusPolicy::new(args.earn_rate, args.cancellation_rate)?;
    let manager = LifecycleManager::new(policy);
    manager.apply_commands(commands);

    output::print_ledger(manager.ledger(), std::io::stdout())?;
    if args.orders {
        println!();
        output::print_orders(manager.orders(), std::io::stdout())?;
    }
    Ok(())
}

#[derive(Parser)]
struct Arguments {
    /// CSV script of register/create/assign/finish/cancel/rate commands.
    input_file: String,
    #[arg(long)]
    log_level: Option<tracing::Level>,
    /// Share of the price credited when a trip finishes.
    #[arg(long, default_value = "0.05")]
    earn_rate: Decimal,
    /// Share of the price refunded when a returning client cancels.
    #[arg(long, default_value = "0.01")]
    cancellation_rate: Decimal,
    /// Also print the order table.
    #[arg(long)]
    orders: bool,
}
