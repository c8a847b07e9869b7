use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use chrono::NaiveDate;
use clap::{Parser, ValueEnum};
use tokio::signal;
use url::Url;

use client_core::{
    status_counts, GraphqlSnapshotSource, LoadState, NoReconnect, ResyncClient, SessionOptions,
    SortDirection, SortState, StatusFilter, StatusSink, TableEvent, TableRecord, TableSession,
    TracingStatusSink,
};
use shared::domain::{ItemStatus, OrderStatus};
use shared::protocol::{InventoryItem, Resource, SalesOrder, SnapshotQuery};

mod config;

#[derive(Parser, Debug)]
#[command(about = "Follow a live dashboard table from the terminal")]
struct Args {
    /// Dashboard backend base url; falls back to dashboard.toml / env.
    #[arg(long)]
    server_url: Option<String>,
    /// Table to follow.
    #[arg(long, value_enum, default_value_t = Table::Items)]
    table: Table,
    /// Snapshot lower bound (orders only), e.g. 2026-01-01.
    #[arg(long)]
    start_date: Option<NaiveDate>,
    /// Snapshot upper bound (orders only).
    #[arg(long)]
    end_date: Option<NaiveDate>,
    /// Case-insensitive search on the name column.
    #[arg(long)]
    query: Option<String>,
    /// Exact status filter (e.g. active, fulfilled).
    #[arg(long)]
    status: Option<String>,
    /// Ask the server to refresh from the upstream API before following.
    #[arg(long)]
    resync: bool,
    /// Keep following push updates until Ctrl-C.
    #[arg(long)]
    follow: bool,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Table {
    Items,
    Orders,
}

trait RenderRow {
    const HEADER: &'static str;

    fn render(&self) -> String;
}

impl RenderRow for InventoryItem {
    const HEADER: &'static str =
        "id         sku         name                           status                  on hand";

    fn render(&self) -> String {
        format!(
            "{:<10} {:<11} {:<30} {:<23} {:>7}",
            self.item_id.0,
            self.sku,
            self.name,
            self.status.label(),
            self.stock_on_hand
        )
    }
}

impl RenderRow for SalesOrder {
    const HEADER: &'static str =
        "id                    number          date         status              lines";

    fn render(&self) -> String {
        let date = self
            .date
            .map_or_else(|| "-".to_string(), |date| date.to_string());
        format!(
            "{:<21} {:<15} {:<12} {:<19} {:>5}",
            self.salesorder_id.0,
            self.salesorder_number,
            date,
            self.status.label(),
            self.line_items.len()
        )
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt().init();
    let args = Args::parse();
    let settings = config::load_settings();

    let server = Url::parse(args.server_url.as_deref().unwrap_or(&settings.server_url))
        .context("invalid server url")?;

    match args.table {
        Table::Items => {
            follow_table::<InventoryItem>(
                &args,
                &settings,
                server,
                Resource::InventoryItems,
                SortState::ascending("name"),
                &ItemStatus::ALL.map(ItemStatus::label),
            )
            .await
        }
        Table::Orders => {
            follow_table::<SalesOrder>(
                &args,
                &settings,
                server,
                Resource::SalesOrders,
                SortState::new("date", SortDirection::Desc),
                &OrderStatus::ALL.map(OrderStatus::label),
            )
            .await
        }
    }
}

async fn follow_table<R>(
    args: &Args,
    settings: &config::Settings,
    server: Url,
    resource: Resource,
    sort: SortState,
    labels: &[&'static str],
) -> Result<()>
where
    R: TableRecord + serde::de::DeserializeOwned + RenderRow,
{
    let sink = Arc::new(TracingStatusSink);
    let query = SnapshotQuery {
        start_date: args.start_date,
        end_date: args.end_date,
    };

    if args.resync {
        let resync = ResyncClient::new(server.clone(), Arc::clone(&sink) as Arc<dyn StatusSink>);
        let bounds = (resource == Resource::SalesOrders).then_some(&query);
        if let Err(err) = resync.trigger(resource, bounds).await {
            tracing::warn!("resync request failed: {err}");
        }
    }

    let mut options = SessionOptions::new(resource, server.clone(), sort);
    options.query = query;

    let session = TableSession::<R>::open(
        options,
        Arc::new(GraphqlSnapshotSource::new(&server, resource)),
        Arc::clone(&sink) as Arc<dyn StatusSink>,
        Arc::new(NoReconnect),
    )?;
    let mut events = session.events();

    loop {
        match session.load_state().await {
            LoadState::Loading => {
                let _ = tokio::time::timeout(Duration::from_millis(200), events.recv()).await;
            }
            LoadState::Ready => break,
            LoadState::Failed(message) => {
                session.close().await;
                bail!("snapshot load failed: {message}");
            }
        }
    }

    if let Some(query) = &args.query {
        session.set_query(query.clone()).await;
    }
    if let Some(status) = &args.status {
        session.set_status(StatusFilter::Only(status.clone())).await;
    }
    session.set_rows_per_page(settings.rows_per_page).await;

    print_table(&session, labels).await;

    if args.follow {
        println!("Following updates; press Ctrl-C to stop.");
        loop {
            tokio::select! {
                _ = signal::ctrl_c() => break,
                event = events.recv() => match event {
                    Ok(TableEvent::Changed) => print_table(&session, labels).await,
                    Ok(TableEvent::ChannelStateChanged(state)) => {
                        tracing::info!(?state, "push channel");
                    }
                    Ok(TableEvent::Error(message)) => tracing::warn!("{message}"),
                    Err(_) => break,
                },
            }
        }
    }

    session.close().await;
    Ok(())
}

async fn print_table<R>(session: &TableSession<R>, labels: &[&'static str])
where
    R: TableRecord + RenderRow,
{
    let rows = session.rows().await;
    let counts = status_counts(&rows, labels);
    let view = session.view().await;

    let summary: Vec<String> = counts
        .iter()
        .map(|(label, count)| format!("{label}: {count}"))
        .collect();
    println!("{} rows | {}", rows.len(), summary.join(" | "));

    if view.not_found {
        if view.can_reset {
            println!("No rows match the active filters.");
        } else {
            println!("No data.");
        }
        return;
    }

    println!("{}", R::HEADER);
    for row in &view.rows {
        println!("{}", row.render());
    }
    let page = session.page_state().await;
    println!(
        "page {} | showing {} of {} filtered",
        page.page + 1,
        view.rows.len(),
        view.total_filtered()
    );
}
