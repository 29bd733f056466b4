//! Terminal tables for the CLI commands.

use analytics::{
    CrossCell, EquityPoint, RiskMetrics, Segment, StrengthSegment, Summary, strength_label,
};
use chrono::Utc;
use comfy_table::presets::UTF8_FULL;
use comfy_table::{Cell, CellAlignment, ContentArrangement, Table};
use core_types::Trade;
use engine::PriceStore;
use rust_decimal::Decimal;

fn new_table(header: Vec<&str>) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(header);
    table
}

fn num(value: Decimal) -> Cell {
    Cell::new(value.round_dp(2)).set_alignment(CellAlignment::Right)
}

fn pct(value: Decimal) -> Cell {
    Cell::new(format!("{}%", value.round_dp(2))).set_alignment(CellAlignment::Right)
}

fn usd(value: Decimal) -> Cell {
    Cell::new(format!("${}", value.round_dp(2))).set_alignment(CellAlignment::Right)
}

/// With no losing trades the ratio is undefined, not zero.
fn profit_factor(summary: &Summary) -> Cell {
    if summary.gross_loss.is_zero() {
        Cell::new("n/a").set_alignment(CellAlignment::Right)
    } else {
        num(summary.profit_factor)
    }
}

pub fn summary_table(summary: &Summary) -> Table {
    let mut table = new_table(vec!["Metric", "Value"]);
    table
        .add_row(vec![Cell::new("Trades"), Cell::new(summary.n)])
        .add_row(vec![
            Cell::new("Wins / Losses / Break-even"),
            Cell::new(format!("{} / {} / {}", summary.wins, summary.losses, summary.break_even())),
        ])
        .add_row(vec![Cell::new("Win rate"), pct(summary.win_rate_pct())])
        .add_row(vec![Cell::new("Avg win"), pct(summary.avg_win_pct)])
        .add_row(vec![Cell::new("Avg loss"), pct(summary.avg_loss_pct)])
        .add_row(vec![Cell::new("Risk/reward"), num(summary.rr)])
        .add_row(vec![Cell::new("Profit factor"), profit_factor(summary)])
        .add_row(vec![Cell::new("Expectancy"), pct(summary.expectancy)])
        .add_row(vec![Cell::new("Edge score"), num(summary.edge_score)])
        .add_row(vec![Cell::new("Total P&L"), usd(summary.total_pnl)])
        .add_row(vec![Cell::new("Avg return"), pct(summary.avg_return)])
        .add_row(vec![
            Cell::new("Avg holding period"),
            Cell::new(humantime::format_duration(summary.average_holding_period)),
        ]);
    table
}

pub fn risk_table(risk: &RiskMetrics) -> Table {
    let mut table = new_table(vec!["Risk", "Value"]);
    table
        .add_row(vec![Cell::new("Max drawdown"), usd(risk.drawdown.max_drawdown)])
        .add_row(vec![Cell::new("Max drawdown %"), pct(risk.drawdown.max_drawdown_percent)])
        .add_row(vec![Cell::new("Sharpe ratio"), num(risk.sharpe_ratio)])
        .add_row(vec![Cell::new("Current streak"), Cell::new(risk.streaks.current)])
        .add_row(vec![Cell::new("Best streak"), Cell::new(risk.streaks.best)])
        .add_row(vec![Cell::new("Worst streak"), Cell::new(risk.streaks.worst)]);
    table
}

pub fn segment_table(segments: &[Segment<String>]) -> Table {
    let mut table = new_table(vec![
        "Segment", "Trades", "Win rate", "Expectancy", "Avg return", "PF", "Edge", "Total P&L",
    ]);
    for segment in segments {
        let s = &segment.summary;
        table.add_row(vec![
            Cell::new(&segment.key),
            Cell::new(s.n),
            pct(s.win_rate_pct()),
            pct(s.expectancy),
            pct(s.avg_return),
            profit_factor(s),
            num(s.edge_score),
            usd(s.total_pnl),
        ]);
    }
    table
}

pub fn strength_table(segments: &[StrengthSegment]) -> Table {
    let mut table = new_table(vec![
        "Strength", "Trades", "Win rate", "Avg win", "Avg loss", "R:R", "Expectancy",
    ]);
    for segment in segments {
        table.add_row(vec![
            Cell::new(strength_label(segment.strength)),
            Cell::new(segment.summary.n),
            pct(segment.summary.win_rate_pct()),
            pct(segment.risk_reward.avg_win_pct),
            pct(segment.risk_reward.avg_loss_pct),
            num(segment.risk_reward.rr),
            pct(segment.summary.expectancy),
        ]);
    }
    table
}

pub fn cross_table(cells: &[CrossCell<String, String>]) -> Table {
    let mut table = new_table(vec!["Agent", "Signal", "Trades", "Win rate", "Expectancy", "Total P&L"]);
    for cell in cells {
        table.add_row(vec![
            Cell::new(&cell.row),
            Cell::new(&cell.column),
            Cell::new(cell.summary.n),
            pct(cell.summary.win_rate_pct()),
            pct(cell.summary.expectancy),
            usd(cell.summary.total_pnl),
        ]);
    }
    table
}

pub fn curve_table(curve: &[EquityPoint]) -> Table {
    let mut table = new_table(vec!["#", "Closed at", "Trade", "P&L", "Equity"]);
    for point in curve {
        table.add_row(vec![
            Cell::new(point.sequence_index),
            Cell::new(point.timestamp.format("%Y-%m-%d %H:%M:%S")),
            Cell::new(&point.trade_id),
            usd(point.pnl),
            usd(point.cumulative_pnl),
        ]);
    }
    table
}

/// One status line for the live view: headline numbers plus unrealized P&L of the
/// open positions and how many of them currently have a live price.
pub fn watch_line(summary: &Summary, marked: &[Trade], store: &PriceStore) -> String {
    let open: Vec<&Trade> = marked.iter().filter(|t| t.is_open()).collect();
    let priced = open.iter().filter(|t| store.get(&t.id).is_some()).count();
    let unrealized: Decimal = open.iter().map(|t| t.pnl_usd).sum();

    format!(
        "[{}] trades {} | win rate {}% | expectancy {}% | total ${} | unrealized ${} ({}/{} open priced)",
        Utc::now().format("%H:%M:%S"),
        summary.n,
        summary.win_rate_pct().round_dp(2),
        summary.expectancy.round_dp(2),
        summary.total_pnl.round_dp(2),
        unrealized.round_dp(2),
        priced,
        open.len(),
    )
}
