// Terminal rendering of a run report: plain text tables or JSON.

use std::fmt::Write;

use anyhow::Context;

use courtside_app::RunReport;
use courtside_engine::model::BudgetCap;
use courtside_engine::strategy::{DayPlan, Strategy};
use courtside_engine::RankOutcome;

/// Prices are integer tenths of a currency unit.
fn price(tenths: u32) -> String {
    format!("{}.{}", tenths / 10, tenths % 10)
}

pub fn render_json(report: &RunReport) -> anyhow::Result<String> {
    serde_json::to_string_pretty(report).context("failed to serialize run report")
}

/// Human-readable report. `unlimited_cap` is shown in place of a budget
/// when the budget check is switched off.
pub fn render_text(report: &RunReport, unlimited_cap: u32) -> String {
    let mut out = String::new();
    let last_week = report.start_gameweek + report.horizon_weeks.saturating_sub(1);
    let team = if report.team_id == courtside_app::SCRATCH_TEAM {
        "new squad".to_string()
    } else {
        format!("team {}", report.team_id)
    };
    let _ = writeln!(
        out,
        "Courtside plan for {team}, gameweeks {}-{last_week}",
        report.start_gameweek
    );

    let budget = &report.budget;
    match budget.cap {
        BudgetCap::Unlimited => {
            let _ = writeln!(out, "Budget: unlimited (reported as {})", price(unlimited_cap));
        }
        BudgetCap::Limited(cap) => match (budget.liquidation_value, budget.bank) {
            (Some(value), Some(bank)) => {
                let _ = writeln!(
                    out,
                    "Budget: {} (roster {} + bank {} - margin {})",
                    price(cap),
                    price(value),
                    price(bank),
                    price(budget.safety_margin)
                );
            }
            _ => {
                let _ = writeln!(out, "Budget: {}", price(cap));
            }
        },
    }

    let settled = report.calendar.settled_days().count();
    if settled > 0 {
        let _ = writeln!(
            out,
            "Banked points: {:.1} over {settled} settled day(s)",
            report.banked_points
        );
    }
    let _ = writeln!(out, "Candidate pool: {} players", report.pool_size);

    for outcome in &report.outcomes {
        out.push('\n');
        match outcome {
            RankOutcome::Solved(strategy) => write_strategy(&mut out, strategy, report.banked_points),
            RankOutcome::Infeasible { rank, reason } => {
                let _ = writeln!(out, "=== Strategy {rank}: no solution ({reason}) ===");
            }
        }
    }

    out
}

fn write_strategy(out: &mut String, strategy: &Strategy, banked: f64) {
    let _ = write!(
        out,
        "=== Strategy {}: {:.1} projected",
        strategy.rank, strategy.objective
    );
    if banked > 0.0 {
        let _ = write!(out, " ({:.1} with banked points)", strategy.objective + banked);
    }
    out.push_str(" ===\n");

    let _ = writeln!(out, "{:<6} {:>9} {:>9}", "Week", "Projected", "Transfers");
    for week in &strategy.weeks {
        let _ = writeln!(
            out,
            "{:<6} {:>9.1} {:>9}",
            format!("GW{}", week.gameweek),
            week.projected,
            format!("{}/{}", week.transfers, week.allowance)
        );
    }

    if strategy.transfers.is_empty() {
        out.push_str("Transfers: none\n");
    } else {
        out.push_str("Transfers:\n");
        for t in &strategy.transfers {
            let sell = t.sell_price.map(|p| format!(" ({})", price(p))).unwrap_or_default();
            let _ = writeln!(
                out,
                "  event {}: {}{sell} -> {} ({})",
                t.event_id,
                t.out_name.as_deref().unwrap_or("-"),
                t.in_name,
                price(t.buy_price)
            );
        }
    }

    for day in &strategy.days {
        write_day(out, day);
    }
}

fn write_day(out: &mut String, day: &DayPlan) {
    let _ = writeln!(
        out,
        "\nEvent {} (GW{}): {:.1} projected",
        day.event_id, day.gameweek, day.projected
    );
    let _ = writeln!(out, "  {:<8} {:<3} {:<24} {:>6}", "Role", "Pos", "Player", "Exp");

    let mut slots: Vec<_> = day.slots.iter().collect();
    slots.sort_by(|a, b| {
        a.role
            .sort_order()
            .cmp(&b.role.sort_order())
            .then(b.expected.total_cmp(&a.expected))
    });
    for slot in slots {
        let marker = if day.transfers_in.contains(&slot.player_id) { " *" } else { "" };
        let _ = writeln!(
            out,
            "  {:<8} {:<3} {:<24} {:>6.1}{marker}",
            slot.role.display_str(),
            slot.position.display_str(),
            slot.name,
            slot.expected
        );
    }
}
