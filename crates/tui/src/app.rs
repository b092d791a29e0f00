use std::{io, sync::Arc, thread, time::Duration};

use anyhow::{Context, Result};
use chrono::Utc;
use crossterm::{
    event::{self, Event, KeyCode, KeyEvent, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, ListState, Paragraph, Wrap},
    Frame, Terminal,
};
use rust_decimal::Decimal;
use tokio::sync::mpsc;
use tracing::{debug, error, info};
use tienda_core::{
    Catalog, CatalogLoader, CheckoutGateway, ListingView, Notice, NoticeLevel, Product, ProductId,
    SortMode, Storefront, ALL_CATEGORIES,
};

const TICK_RATE: Duration = Duration::from_millis(250);
const MAX_NOTICE_SECS: u64 = 86_400;

#[derive(Debug, Clone)]
struct Theme {
    primary_fg: Color,
    accent: Color,
    muted: Color,
    selection_bg: Color,
    success: Color,
    warning: Color,
    danger: Color,
}

impl Default for Theme {
    fn default() -> Self {
        Self {
            primary_fg: Color::White,
            accent: Color::Cyan,
            muted: Color::DarkGray,
            selection_bg: Color::DarkGray,
            success: Color::Green,
            warning: Color::Yellow,
            danger: Color::Red,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Focus {
    Listing,
    Offers,
    Cart,
}

impl Focus {
    fn next(self) -> Self {
        match self {
            Self::Listing => Self::Offers,
            Self::Offers => Self::Cart,
            Self::Cart => Self::Listing,
        }
    }
}

enum AppEvent {
    Input(Event),
    Tick,
    CatalogLoaded(tienda_core::Result<Catalog>),
    CheckoutFinished(tienda_core::Result<()>),
}

/// Terminal front end driving a [`Storefront`] session.
pub struct TiendaApp {
    store: Storefront,
    loader: CatalogLoader,
    gateway: Arc<dyn CheckoutGateway>,
    state: UiState,
    notice: Option<Notice>,
    notice_ttl: chrono::Duration,
    loading: bool,
    theme: Theme,
    event_tx: Option<mpsc::Sender<AppEvent>>,
}

impl TiendaApp {
    pub fn new(
        store: Storefront,
        loader: CatalogLoader,
        gateway: Arc<dyn CheckoutGateway>,
        notice_secs: u64,
    ) -> Self {
        let notice_ttl = chrono::Duration::seconds(notice_secs.min(MAX_NOTICE_SECS) as i64);
        Self {
            store,
            loader,
            gateway,
            state: UiState::default(),
            notice: None,
            notice_ttl,
            loading: false,
            theme: Theme::default(),
            event_tx: None,
        }
    }

    pub async fn run(&mut self) -> Result<()> {
        let mut stdout = io::stdout();
        enable_raw_mode().context("failed to enter raw mode")?;
        execute!(stdout, EnterAlternateScreen).context("failed to enter alternate screen")?;
        let backend = CrosstermBackend::new(stdout);
        let mut terminal = Terminal::new(backend).context("failed to create terminal")?;
        terminal.hide_cursor()?;
        terminal.clear()?;

        let (event_tx, mut event_rx) = mpsc::channel::<AppEvent>(128);
        spawn_input_thread(event_tx.clone());
        self.event_tx = Some(event_tx);
        self.start_catalog_load();

        loop {
            terminal.draw(|frame| self.draw(frame))?;
            if self.state.should_quit {
                break;
            }
            let maybe_event = event_rx.recv().await;
            if !self.process_app_event(maybe_event) {
                break;
            }
            if self.state.should_quit {
                break;
            }
        }

        restore_terminal(&mut terminal)?;
        self.event_tx = None;
        Ok(())
    }

    fn process_app_event(&mut self, maybe_event: Option<AppEvent>) -> bool {
        match maybe_event {
            Some(AppEvent::Input(Event::Key(key))) => {
                self.handle_key(key);
                true
            }
            Some(AppEvent::Input(_)) => true,
            Some(AppEvent::Tick) => {
                self.handle_tick();
                true
            }
            Some(AppEvent::CatalogLoaded(result)) => {
                self.loading = false;
                let notice = self.store.apply_catalog_result(result);
                self.refresh_listings();
                self.notify(notice);
                true
            }
            Some(AppEvent::CheckoutFinished(result)) => {
                let notice = self.store.finish_checkout(result);
                self.state.clamp_cart_cursor(self.store.cart().len());
                self.notify(Some(notice));
                true
            }
            None => false,
        }
    }

    fn handle_tick(&mut self) {
        let expired = self
            .notice
            .as_ref()
            .map(|notice| notice.is_expired(Utc::now(), self.notice_ttl))
            .unwrap_or(false);
        if expired {
            self.notice = None;
        }
    }

    fn notify(&mut self, notice: Option<Notice>) {
        if let Some(notice) = notice {
            debug!(text = %notice.message, "Notice");
            self.notice = Some(notice);
        }
    }

    /// Spawn a catalog load unless one is already running. Returns whether it started.
    fn start_catalog_load(&mut self) -> bool {
        if self.loading {
            return false;
        }
        let Some(tx) = self.event_tx.clone() else {
            return false;
        };
        self.loading = true;
        let loader = self.loader.clone();
        info!(source = %loader.source(), "Loading catalog");
        tokio::spawn(async move {
            let result = loader.load().await;
            if tx.send(AppEvent::CatalogLoaded(result)).await.is_err() {
                error!("Catalog result dropped; event loop closed");
            }
        });
        true
    }

    fn start_checkout(&mut self) {
        let Some(tx) = self.event_tx.clone() else {
            return;
        };
        let payload = match self.store.begin_checkout() {
            Ok(payload) => payload,
            Err(notice) => {
                self.notify(Some(notice));
                return;
            }
        };
        let gateway = Arc::clone(&self.gateway);
        info!(lines = self.store.cart().len(), "Submitting checkout");
        self.notify(Some(Notice::info("Procesando la compra…")));
        tokio::spawn(async move {
            let result = gateway.submit(&payload).await;
            if tx.send(AppEvent::CheckoutFinished(result)).await.is_err() {
                error!("Checkout result dropped; event loop closed");
            }
        });
    }

    fn refresh_listings(&mut self) {
        self.state.listing = self.store.listing();
        self.state.offers = self.store.offers();
        self.state.categories = self.store.catalog().categories();
        self.state.clamp_cursors(self.store.cart().len());
    }

    fn handle_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Char('q') | KeyCode::Esc => self.state.should_quit = true,
            KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                self.state.should_quit = true
            }
            KeyCode::Char('r') => {
                if self.start_catalog_load() {
                    self.notify(Some(Notice::info("Recargando productos…")));
                }
            }
            KeyCode::Tab => self.state.focus = self.state.focus.next(),
            KeyCode::Char('j') | KeyCode::Down => self.move_cursor(1),
            KeyCode::Char('k') | KeyCode::Up => self.move_cursor(-1),
            KeyCode::Enter | KeyCode::Char('a') => {
                if let Some(id) = self.selected_id() {
                    let notice = self.store.add_item(id);
                    self.notify(notice);
                }
            }
            KeyCode::Char('d') | KeyCode::Delete | KeyCode::Backspace => {
                if let Some(id) = self.selected_id() {
                    let notice = self.store.remove_item(id);
                    self.state.clamp_cart_cursor(self.store.cart().len());
                    self.notify(notice);
                }
            }
            KeyCode::Char('c') => self.cycle_category(),
            KeyCode::Char('s') => self.cycle_sort(),
            KeyCode::Char('p') => self.start_checkout(),
            _ => {}
        }
    }

    fn move_cursor(&mut self, delta: isize) {
        let len = match self.state.focus {
            Focus::Listing => self.state.listing.len(),
            Focus::Offers => self.state.offers.len(),
            Focus::Cart => self.store.cart().len(),
        };
        let cursor = self.state.cursor_mut();
        *cursor = step(*cursor, delta, len);
    }

    fn selected_id(&self) -> Option<ProductId> {
        match self.state.focus {
            Focus::Listing => self.state.listing.get(self.state.listing_cursor).map(|p| p.id),
            Focus::Offers => self.state.offers.get(self.state.offers_cursor).map(|p| p.id),
            Focus::Cart => self
                .store
                .cart()
                .lines()
                .get(self.state.cart_cursor)
                .map(|line| line.id),
        }
    }

    fn cycle_category(&mut self) {
        let options = self.state.categories.len() + 1;
        self.state.category_index = (self.state.category_index + 1) % options;
        let category = match self.state.category_index {
            0 => ALL_CATEGORIES.to_string(),
            index => self.state.categories[index - 1].clone(),
        };
        self.state.listing = self.store.filter_by_category(category);
        self.state.listing_cursor = 0;
    }

    fn cycle_sort(&mut self) {
        self.state.sort_mode = self.state.sort_mode.next();
        self.state.listing = self.store.sort_by(self.state.sort_mode);
        self.state.listing_cursor = 0;
    }

    fn draw(&mut self, frame: &mut Frame) {
        let size = frame.size();
        let rows = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(3),
                Constraint::Min(8),
                Constraint::Length(4),
            ])
            .split(size);

        let columns = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(60), Constraint::Percentage(40)])
            .split(rows[1]);

        let products = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Percentage(65), Constraint::Percentage(35)])
            .split(columns[0]);

        self.render_header(frame, rows[0]);
        self.render_products(frame, products[0], Focus::Listing);
        self.render_products(frame, products[1], Focus::Offers);
        self.render_cart(frame, columns[1]);
        self.render_status(frame, rows[2]);
    }

    fn render_header(&self, frame: &mut Frame, area: Rect) {
        let totals = self.store.totals();
        let view = match self.store.view() {
            ListingView::Category(category) => format!("Categoría: {category}"),
            ListingView::Sorted(mode) => format!("Orden: {mode}"),
        };
        let mut spans = vec![
            Span::styled(
                "Tienda",
                Style::default()
                    .fg(self.theme.accent)
                    .add_modifier(Modifier::BOLD),
            ),
            Span::raw("  ·  "),
            Span::styled(view, Style::default().fg(self.theme.primary_fg)),
            Span::raw("  ·  "),
            Span::styled(
                format!("🛒 {}", totals.item_count),
                Style::default().fg(self.theme.warning),
            ),
        ];
        if self.loading {
            spans.push(Span::styled(
                "  cargando…",
                Style::default().fg(self.theme.muted),
            ));
        }
        let header = Paragraph::new(Line::from(spans)).block(Block::default().borders(Borders::ALL));
        frame.render_widget(header, area);
    }

    fn render_products(&self, frame: &mut Frame, area: Rect, pane: Focus) {
        let (products, cursor, title) = match pane {
            Focus::Offers => (&self.state.offers, self.state.offers_cursor, "Ofertas"),
            _ => (&self.state.listing, self.state.listing_cursor, "Productos"),
        };
        let focused = self.state.focus == pane;

        let items: Vec<ListItem> = products
            .iter()
            .map(|product| ListItem::new(self.product_line(product, pane == Focus::Offers)))
            .collect();

        let mut list_state = ListState::default();
        if focused && !products.is_empty() {
            list_state.select(Some(cursor.min(products.len() - 1)));
        }
        let list = List::new(items)
            .block(self.pane_block(title, focused))
            .highlight_style(Style::default().bg(self.theme.selection_bg))
            .highlight_symbol("▶ ");
        frame.render_stateful_widget(list, area, &mut list_state);
    }

    fn product_line(&self, product: &Product, as_offer: bool) -> Line<'static> {
        let mut spans = vec![
            Span::styled(
                product.nombre.clone(),
                Style::default()
                    .fg(self.theme.primary_fg)
                    .add_modifier(Modifier::BOLD),
            ),
            Span::styled(
                format!(" [{}] ", product.categoria),
                Style::default().fg(self.theme.muted),
            ),
        ];
        if as_offer {
            spans.push(Span::styled(
                format_price(product.precio),
                Style::default()
                    .fg(self.theme.muted)
                    .add_modifier(Modifier::CROSSED_OUT),
            ));
            spans.push(Span::raw(" "));
            spans.push(Span::styled(
                format_price(product.offer_price()),
                Style::default().fg(self.theme.success),
            ));
        } else {
            spans.push(Span::styled(
                format_price(product.precio),
                Style::default().fg(self.theme.accent),
            ));
        }
        Line::from(spans)
    }

    fn render_cart(&self, frame: &mut Frame, area: Rect) {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Min(3), Constraint::Length(5)])
            .split(area);

        let lines = self.store.cart().lines();
        let focused = self.state.focus == Focus::Cart;
        let items: Vec<ListItem> = lines
            .iter()
            .map(|line| {
                ListItem::new(Line::from(vec![
                    Span::styled(
                        line.nombre.clone(),
                        Style::default().fg(self.theme.primary_fg),
                    ),
                    Span::styled(
                        format!(" - {} x {}", format_price(line.precio), line.cantidad),
                        Style::default().fg(self.theme.muted),
                    ),
                ]))
            })
            .collect();
        let mut list_state = ListState::default();
        if focused && !lines.is_empty() {
            list_state.select(Some(self.state.cart_cursor.min(lines.len() - 1)));
        }
        let list = List::new(items)
            .block(self.pane_block("Carrito", focused))
            .highlight_style(Style::default().bg(self.theme.selection_bg))
            .highlight_symbol("▶ ");
        frame.render_stateful_widget(list, chunks[0], &mut list_state);

        let totals = self.store.totals();
        let summary = Paragraph::new(vec![
            Line::from(format!("Subtotal: {}", format_price(totals.subtotal))),
            Line::from(format!("IVA (21%): {}", format_price(totals.iva))),
            Line::from(Span::styled(
                format!("Total: {}", format_price(totals.total)),
                Style::default()
                    .fg(self.theme.accent)
                    .add_modifier(Modifier::BOLD),
            )),
        ])
        .block(Block::default().borders(Borders::ALL).title("Resumen"));
        frame.render_widget(summary, chunks[1]);
    }

    fn render_status(&self, frame: &mut Frame, area: Rect) {
        let primary = match &self.notice {
            Some(notice) => {
                let color = match notice.level {
                    NoticeLevel::Info => self.theme.primary_fg,
                    NoticeLevel::Success => self.theme.success,
                    NoticeLevel::Error => self.theme.danger,
                };
                Line::from(Span::styled(notice.message.clone(), Style::default().fg(color)))
            }
            None => Line::from(""),
        };
        let help = Line::from(Span::styled(
            "Tab panel · j/k mover · a añadir · d eliminar · c categoría · s ordenar · p comprar · r recargar · q salir",
            Style::default().fg(self.theme.muted),
        ));
        let paragraph = Paragraph::new(vec![primary, help])
            .block(Block::default().borders(Borders::ALL).title("Estado"))
            .wrap(Wrap { trim: true });
        frame.render_widget(paragraph, area);
    }

    fn pane_block<'a>(&self, title: &'a str, focused: bool) -> Block<'a> {
        let border = if focused {
            self.theme.accent
        } else {
            self.theme.muted
        };
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(border))
            .title(title)
    }
}

fn restore_terminal(terminal: &mut Terminal<CrosstermBackend<io::Stdout>>) -> Result<()> {
    disable_raw_mode().context("failed to disable raw mode")?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)
        .context("failed to leave alternate screen")?;
    terminal.show_cursor()?;
    Ok(())
}

fn spawn_input_thread(sender: mpsc::Sender<AppEvent>) {
    thread::spawn(move || loop {
        match event::poll(TICK_RATE) {
            Ok(true) => match event::read() {
                Ok(evt) => {
                    if sender.blocking_send(AppEvent::Input(evt)).is_err() {
                        break;
                    }
                }
                Err(_) => break,
            },
            Ok(false) => {
                if sender.blocking_send(AppEvent::Tick).is_err() {
                    break;
                }
            }
            Err(_) => break,
        }
    });
}

struct UiState {
    listing: Vec<Product>,
    offers: Vec<Product>,
    categories: Vec<String>,
    category_index: usize,
    sort_mode: SortMode,
    focus: Focus,
    listing_cursor: usize,
    offers_cursor: usize,
    cart_cursor: usize,
    should_quit: bool,
}

impl Default for UiState {
    fn default() -> Self {
        Self {
            listing: Vec::new(),
            offers: Vec::new(),
            categories: Vec::new(),
            category_index: 0,
            sort_mode: SortMode::Catalog,
            focus: Focus::Listing,
            listing_cursor: 0,
            offers_cursor: 0,
            cart_cursor: 0,
            should_quit: false,
        }
    }
}

impl UiState {
    fn cursor_mut(&mut self) -> &mut usize {
        match self.focus {
            Focus::Listing => &mut self.listing_cursor,
            Focus::Offers => &mut self.offers_cursor,
            Focus::Cart => &mut self.cart_cursor,
        }
    }

    fn clamp_cursors(&mut self, cart_len: usize) {
        self.listing_cursor = self.listing_cursor.min(self.listing.len().saturating_sub(1));
        self.offers_cursor = self.offers_cursor.min(self.offers.len().saturating_sub(1));
        if self.category_index > self.categories.len() {
            self.category_index = 0;
        }
        self.clamp_cart_cursor(cart_len);
    }

    fn clamp_cart_cursor(&mut self, cart_len: usize) {
        self.cart_cursor = self.cart_cursor.min(cart_len.saturating_sub(1));
    }
}

fn step(cursor: usize, delta: isize, len: usize) -> usize {
    if len == 0 {
        return 0;
    }
    let next = cursor as isize + delta;
    next.clamp(0, len as isize - 1) as usize
}

fn format_price(value: Decimal) -> String {
    format!("{:.2}€", value.round_dp(2))
}
