use crate::engine::ratio;
use core_types::{PriceLookup, Trade};
use rust_decimal::Decimal;

/// Returns a copy of `trades` with every OPEN trade marked to market.
///
/// For an open trade the current price comes from `prices`; when none is known the
/// entry price stands in, which yields zero unrealized P&L. Closed and failed trades
/// are immutable and come back unchanged.
pub fn mark_to_market<P: PriceLookup + ?Sized>(trades: &[Trade], prices: &P) -> Vec<Trade> {
    trades
        .iter()
        .map(|trade| {
            if trade.is_open() {
                mark_open_trade(trade, prices)
            } else {
                trade.clone()
            }
        })
        .collect()
}

fn mark_open_trade<P: PriceLookup + ?Sized>(trade: &Trade, prices: &P) -> Trade {
    let current = prices.current_price(&trade.id).unwrap_or(trade.entry_price);
    let favourable_move = current
        .saturating_sub(trade.entry_price)
        .saturating_mul(trade.side.direction());

    let mut marked = trade.clone();
    marked.current_price = Some(current);
    marked.pnl_usd = favourable_move.saturating_mul(trade.quantity);
    marked.pnl_percent = ratio(favourable_move, trade.entry_price).saturating_mul(Decimal::ONE_HUNDRED);
    marked
}
