//! Daily owner reports.
//!
//! A report covers one tenant's orders for the 24 hours before the run.
//! Rendering produces the subject, HTML and text bodies, and a CSV of the
//! orders for attachment.

use serde::{Deserialize, Serialize};

use crate::domain::foundation::{TenantId, Timestamp};

/// Order fields a report needs. Read-only projection of the orders table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportOrder {
    pub order_id: i64,
    pub table_number: String,
    pub status: String,
    pub total_minor: i64,
    pub created_at: Timestamp,
}

/// Totals over a set of orders, in paise.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderSummary {
    pub order_count: u64,
    pub revenue_minor: i64,
    pub average_order_minor: i64,
}

impl OrderSummary {
    pub fn from_orders(orders: &[ReportOrder]) -> Self {
        let order_count = orders.len() as u64;
        let revenue_minor: i64 = orders.iter().map(|o| o.total_minor).sum();
        let average_order_minor = if order_count == 0 {
            0
        } else {
            revenue_minor / order_count as i64
        };
        Self {
            order_count,
            revenue_minor,
            average_order_minor,
        }
    }
}

/// Formats paise as rupees with two decimals, e.g. `₹2,499.00`.
pub fn format_inr(minor: i64) -> String {
    let sign = if minor < 0 { "-" } else { "" };
    let minor = minor.unsigned_abs();
    let rupees = (minor / 100).to_string();
    let paise = minor % 100;

    let mut grouped = String::with_capacity(rupees.len() + rupees.len() / 3);
    for (i, c) in rupees.chars().enumerate() {
        if i > 0 && (rupees.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(c);
    }
    format!("{}\u{20b9}{}.{:02}", sign, grouped, paise)
}

/// One tenant's 24-hour report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DailyReport {
    pub tenant_id: TenantId,
    pub tenant_name: String,
    pub period_start: Timestamp,
    pub period_end: Timestamp,
    pub summary: OrderSummary,
    pub orders: Vec<ReportOrder>,
}

impl DailyReport {
    pub fn new(
        tenant_id: TenantId,
        tenant_name: impl Into<String>,
        period_end: Timestamp,
        orders: Vec<ReportOrder>,
    ) -> Self {
        Self {
            tenant_id,
            tenant_name: tenant_name.into(),
            period_start: period_end.minus_days(1),
            period_end,
            summary: OrderSummary::from_orders(&orders),
            orders,
        }
    }

    pub fn subject(&self) -> String {
        format!(
            "24-Hour Report - {} ({})",
            self.tenant_name,
            self.period_end.date()
        )
    }

    pub fn attachment_filename(&self) -> String {
        format!("report_{}.csv", self.period_end.date().format("%Y%m%d"))
    }

    pub fn render_text(&self) -> String {
        format!(
            "24-hour report for {name}\n\
             Period: {start} to {end}\n\n\
             Orders: {count}\n\
             Revenue: {revenue}\n\
             Average order value: {avg}\n",
            name = self.tenant_name,
            start = self.period_start.as_datetime().format("%Y-%m-%d %H:%M UTC"),
            end = self.period_end.as_datetime().format("%Y-%m-%d %H:%M UTC"),
            count = self.summary.order_count,
            revenue = format_inr(self.summary.revenue_minor),
            avg = format_inr(self.summary.average_order_minor),
        )
    }

    pub fn render_html(&self) -> String {
        let rows: String = self
            .orders
            .iter()
            .map(|o| {
                format!(
                    "<tr><td>#{}</td><td>{}</td><td>{}</td><td>{}</td></tr>",
                    o.order_id,
                    escape_html(&o.table_number),
                    escape_html(&o.status),
                    format_inr(o.total_minor)
                )
            })
            .collect();

        format!(
            "<h2>24-hour report for {name}</h2>\
             <p>{start} to {end}</p>\
             <ul><li>Orders: {count}</li><li>Revenue: {revenue}</li>\
             <li>Average order value: {avg}</li></ul>\
             <table><tr><th>Order</th><th>Table</th><th>Status</th><th>Total</th></tr>{rows}</table>",
            name = escape_html(&self.tenant_name),
            start = self.period_start.as_datetime().format("%Y-%m-%d %H:%M UTC"),
            end = self.period_end.as_datetime().format("%Y-%m-%d %H:%M UTC"),
            count = self.summary.order_count,
            revenue = format_inr(self.summary.revenue_minor),
            avg = format_inr(self.summary.average_order_minor),
            rows = rows,
        )
    }

    /// Orders as CSV, totals in rupees.
    pub fn render_csv(&self) -> String {
        let mut out = String::from("order_id,table,status,total,created_at\n");
        for o in &self.orders {
            out.push_str(&format!(
                "{},{},{},{}.{:02},{}\n",
                o.order_id,
                csv_field(&o.table_number),
                csv_field(&o.status),
                o.total_minor / 100,
                (o.total_minor % 100).abs(),
                o.created_at
            ));
        }
        out
    }
}

fn escape_html(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

fn csv_field(s: &str) -> String {
    if s.contains([',', '"', '\n']) {
        format!("\"{}\"", s.replace('"', "\"\""))
    } else {
        s.to_string()
    }
}
