//! Command-line interface: config checking and a scripted demo session.

use std::path::PathBuf;

use chrono::{Duration, Utc};
use clap::{Parser, Subcommand};
use rust_decimal::Decimal;
use tabled::{Table, Tabled};
use tracing::info;

use crate::app::AppState;
use crate::config::Config;
use crate::crypto::Ed25519Signer;
use crate::domain::{Amount, Bps, Order, OrderSide, Outcome, QuestionId, Role, UserId};
use crate::engine::Trade;
use crate::error::Error;
use crate::market::{winning_leaf, EpochMode};

#[derive(Parser)]
#[command(name = "matchbook", version, about = "Prediction-market settlement engine")]
pub struct Cli {
    /// Path to a TOML config file; defaults are used when omitted.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Validate the config file and print the resolved settings.
    CheckConfig,
    /// Run a scripted session: deposits, a JIT match, a swap, resolution,
    /// and a claim, then print the resulting accounts.
    Demo {
        /// Emit the executed trades as JSON audit records instead of tables.
        #[arg(long)]
        json: bool,
    },
}

/// Entry point for the binary.
pub fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = match &cli.config {
        Some(path) => Config::load(path)?,
        None => Config::default(),
    };
    config.init_logging();

    match cli.command {
        Command::CheckConfig => check_config(&config),
        Command::Demo { json } => demo(&config, json),
    }
}

fn check_config(config: &Config) -> anyhow::Result<()> {
    println!("config ok");
    println!("  oracle:    {}", config.engine.oracle);
    println!("  admin:     {}", config.engine.admin);
    println!("  treasury:  {}", config.engine.treasury);
    println!("  trade fee: {}", Bps::new(config.fees.trade_bps));
    println!("  claim fee: {}", Bps::new(config.fees.claim_bps));
    Ok(())
}

#[derive(Tabled)]
struct AccountRow {
    user: String,
    wallet: Decimal,
    available: Decimal,
    yes: u64,
    no: u64,
}

#[derive(Tabled)]
struct TradeRow {
    trade: String,
    mode: String,
    fill: u64,
    price: String,
    buyer: String,
    seller: String,
}

fn demo(config: &Config, json: bool) -> anyhow::Result<()> {
    let (state, asset) = AppState::in_memory(config);
    let admin = config.admin();
    let oracle = config.oracle();
    let decimals = state.collateral_decimals();

    let alice = Ed25519Signer::generate();
    let bob = Ed25519Signer::generate();
    let charlie = Ed25519Signer::generate();
    let names = [
        (alice.user_id(), "alice"),
        (bob.user_id(), "bob"),
        (charlie.user_id(), "charlie"),
    ];

    let question = QuestionId::new("will-it-rain-tomorrow");
    let now = Utc::now();
    {
        let mut engine = state.engine();
        engine.grant_role(&admin, admin.clone(), Role::Matcher)?;
        engine.create_market(&admin, question.clone(), 2, None, EpochMode::Manual, now)?;

        for signer in [&alice, &bob, &charlie] {
            asset.fund(signer.user_id(), Amount::new(2_000_000));
            engine.deposit(&signer.user_id(), Amount::new(2_000_000))?;
        }
    }

    let expires = now + Duration::hours(1);
    let yes = Outcome::new(0);
    let mut trades: Vec<Trade> = Vec::new();

    // JIT mint: alice buys YES at 60%, bob takes the other side.
    let maker = alice.sign(Order {
        maker: alice.user_id(),
        question_id: question.clone(),
        outcome: yes,
        amount: Amount::new(1_000_000),
        price: Bps::new(6000),
        nonce: 1,
        expires_at: expires,
        side: OrderSide::Buy,
    });
    let taker = bob.sign(Order {
        maker: bob.user_id(),
        question_id: question.clone(),
        outcome: yes,
        amount: Amount::new(1_000_000),
        price: Bps::new(6000),
        nonce: 1,
        expires_at: expires,
        side: OrderSide::Sell,
    });
    trades.push(state.engine().execute_order_match(
        &admin,
        &maker,
        &taker,
        Amount::new(1_000_000),
        now,
    )?);

    // Token swap: charlie buys alice's freshly minted YES inventory at 68%.
    let maker = alice.sign(Order {
        maker: alice.user_id(),
        question_id: question.clone(),
        outcome: yes,
        amount: Amount::new(1_000_000),
        price: Bps::new(6800),
        nonce: 2,
        expires_at: expires,
        side: OrderSide::Sell,
    });
    let taker = charlie.sign(Order {
        maker: charlie.user_id(),
        question_id: question.clone(),
        outcome: yes,
        amount: Amount::new(1_000_000),
        price: Bps::new(6800),
        nonce: 1,
        expires_at: expires,
        side: OrderSide::Buy,
    });
    trades.push(state.engine().execute_order_match(
        &admin,
        &maker,
        &taker,
        Amount::new(1_000_000),
        now,
    )?);

    // Resolution: YES wins, charlie claims.
    {
        let mut engine = state.engine();
        let condition = engine.condition_id(&question, 1)?;
        let root = winning_leaf(&condition, yes);
        engine.resolve_market_epoch(&oracle, &question, 1, root, now)?;
        let net = engine.claim_winnings(&charlie.user_id(), &question, 1, yes, &[], now)?;
        info!(%net, "demo claim settled");
    }

    if json {
        let rendered = serde_json::to_string_pretty(&trades).map_err(Error::Json)?;
        println!("{rendered}");
        return Ok(());
    }

    let engine = state.engine();
    let yes_token = engine.token_id(&question, 1, yes)?;
    let no_token = engine.token_id(&question, 1, yes.binary_complement())?;
    let treasury = engine.treasury().clone();

    let mut rows = Vec::new();
    for (id, name) in &names {
        rows.push(AccountRow {
            user: (*name).to_string(),
            wallet: asset.wallet(id).to_decimal(decimals),
            available: engine.available_balance(id).to_decimal(decimals),
            yes: engine.position_balance(id, &yes_token).units(),
            no: engine.position_balance(id, &no_token).units(),
        });
    }
    rows.push(AccountRow {
        user: "treasury".to_string(),
        wallet: asset.wallet(&treasury).to_decimal(decimals),
        available: engine.available_balance(&treasury).to_decimal(decimals),
        yes: 0,
        no: 0,
    });
    println!("{}", Table::new(rows));

    let short = |id: &UserId| {
        names
            .iter()
            .find(|(known, _)| known == id)
            .map_or_else(|| id.as_str().chars().take(8).collect(), |(_, n)| (*n).to_string())
    };
    let trade_rows: Vec<TradeRow> = trades
        .iter()
        .map(|t| TradeRow {
            trade: t.id.as_str().chars().take(8).collect(),
            mode: format!("{:?}", t.mode),
            fill: t.fill.units(),
            price: t.price.to_string(),
            buyer: short(&t.buyer),
            seller: short(&t.seller),
        })
        .collect();
    println!("{}", Table::new(trade_rows));

    Ok(())
}
