//! Result-set command implementations (invoices, invoice)

use anyhow::{anyhow, Context, Result};
use recon_core::models::{Invoice, InvoiceDetail, InvoiceStatus, Severity};
use recon_core::{FetchController, FetchHandle, InvoiceBoard, ReconciliationService};
use tracing::{debug, info};

use super::{on_interrupt, truncate, wait_interruptible};

/// Icon shown next to a status
pub fn severity_icon(severity: Severity) -> &'static str {
    match severity {
        Severity::Success => "✅",
        Severity::Info => "⏳",
        Severity::Warning => "⚠️ ",
        Severity::Error => "❌",
        Severity::Default => "• ",
    }
}

/// Keep invoices with the given status label, if one was requested
pub fn filter_by_status<'a>(invoices: &'a [Invoice], status: Option<&str>) -> Result<Vec<&'a Invoice>> {
    let wanted = status
        .map(str::parse::<InvoiceStatus>)
        .transpose()
        .map_err(|e| anyhow!(e))?;

    Ok(invoices
        .iter()
        .filter(|invoice| wanted.map_or(true, |status| invoice.status == status))
        .collect())
}

pub async fn cmd_invoices(controller: &FetchController, status: Option<&str>, json: bool) -> Result<()> {
    debug!(
        backend = controller.service().name(),
        timeout_secs = controller.timeout().as_secs(),
        "Loading invoices"
    );
    let mut board = InvoiceBoard::new();
    board.refresh(controller);

    let interrupt = board
        .in_flight()
        .map(FetchHandle::cancel_token)
        .map(|token| on_interrupt(move || token.cancel()));
    let outcome = board.settle().await;
    if let Some(interrupt) = interrupt {
        interrupt.abort();
    }

    if let Some(Err(err)) = outcome {
        return Err(err).context("Failed to load invoices");
    }

    let invoices = match board.invoices() {
        Some(invoices) => invoices,
        None => {
            println!("No invoices loaded.");
            return Ok(());
        }
    };
    info!("Loaded {} invoices", invoices.len());
    let shown = filter_by_status(invoices, status)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&shown)?);
        return Ok(());
    }

    if shown.is_empty() {
        println!("No invoices found.");
        return Ok(());
    }

    println!();
    println!("📄 Invoices ({})", shown.len());
    println!("   ─────────────────────────────────────────────────────────────────────────");
    println!(
        "   {:<12} {:<22} {:>12}  {:<10}  {}",
        "Number", "Vendor", "Amount", "Date", "Status"
    );

    for invoice in &shown {
        let flagged = if invoice.has_discrepancies() {
            format!(" ({} issue{})", invoice.discrepancies.len(), plural(invoice.discrepancies.len()))
        } else {
            String::new()
        };
        println!(
            "   {:<12} {:<22} {:>12}  {}  {} {}{}",
            truncate(&invoice.invoice_number, 12),
            truncate(&invoice.vendor, 22),
            format!("${:.2}", invoice.amount),
            invoice.date,
            severity_icon(invoice.severity()),
            invoice.status,
            flagged
        );
    }

    let needs_review = shown
        .iter()
        .filter(|invoice| !invoice.severity().is_clean())
        .count();
    println!();
    if needs_review > 0 {
        println!("   {} invoice{} need review.", needs_review, plural(needs_review));
        println!("   Run 'recon invoice <number>' for details.");
    } else {
        println!("   All invoices reconciled.");
    }

    Ok(())
}

pub async fn cmd_invoice(controller: &FetchController, number: &str, json: bool) -> Result<()> {
    debug!(
        backend = controller.service().name(),
        timeout_secs = controller.timeout().as_secs(),
        "Loading invoice {}", number
    );
    let handle = controller.start_fetch(Some(number));
    let detail = wait_interruptible(handle)
        .await
        .with_context(|| format!("Failed to load invoice {}", number))?
        .into_detail()
        .ok_or_else(|| anyhow!("Service returned a result set instead of one invoice"))?;

    if json {
        println!("{}", serde_json::to_string_pretty(&detail)?);
        return Ok(());
    }

    print_detail(&detail, number);
    Ok(())
}

fn print_detail(detail: &InvoiceDetail, requested: &str) {
    let invoice = &detail.invoice;

    if invoice.invoice_number != requested.trim() {
        println!(
            "⚠️  No exact match for {}; showing {}",
            requested, invoice.invoice_number
        );
    }

    println!();
    println!("📄 Invoice {}", invoice.invoice_number);
    println!("   ─────────────────────────────────────────────");
    println!("   Vendor:   {}", invoice.vendor);
    println!("   Amount:   ${:.2}", invoice.amount);
    println!("   Date:     {}", invoice.date);
    println!(
        "   Status:   {} {}",
        severity_icon(invoice.severity()),
        invoice.status
    );
    if let Some(po) = &detail.po_number {
        println!("   PO:       {}", po);
    }
    if let Some(due) = &detail.due_date {
        println!("   Due:      {}", due);
    }
    if let Some(description) = &detail.description {
        println!("   Notes:    {}", description);
    }

    if invoice.has_discrepancies() {
        println!();
        println!("   Discrepancies:");
        for discrepancy in &invoice.discrepancies {
            println!(
                "   • {} [{}]: {}",
                discrepancy.field, discrepancy.kind, discrepancy.reason
            );
        }
    }

    if !invoice.logs.is_empty() {
        println!();
        println!("   Logs:");
        for line in invoice.logs.lines() {
            println!("   {}", line);
        }
    }
    println!();
}

fn plural(count: usize) -> &'static str {
    if count == 1 {
        ""
    } else {
        "s"
    }
}
