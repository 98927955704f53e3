use crate::client::AppSnapshot;
use color_eyre::eyre::{
    Result,
    eyre,
};
use crossterm::{
    event::{
        self,
        Event,
        KeyCode,
        KeyEvent,
        KeyEventKind,
    },
    terminal::{
        disable_raw_mode,
        enable_raw_mode,
    },
};
use ratatui::{
    prelude::*,
    widgets::*,
};
use red_packet::{
    controller::{
        PendingAction,
        STORAGE_CHAINS,
        StorageDraft,
        TransferDraft,
    },
    format::{
        describe_network,
        format_eth,
        format_flag,
        format_timestamp,
        full_address,
        short_address,
    },
};
use std::io::stdout;
use tokio::sync::mpsc;
use tracing::warn;
use unicode_width::UnicodeWidthStr;

pub type InputEventReceiver = mpsc::UnboundedReceiver<Event>;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum UserEvent {
    Quit,
    Connect,
    Disconnect,
    Refresh,
    Claim,
    Clear,
    ConfirmDeposit(String),
    ConfirmLog(TransferDraft),
    ConfirmStore(StorageDraft),
    Abandon,
    Redraw,
}

#[derive(Debug, Default)]
pub struct UiState {
    mode: Mode,
    terminal: Option<Terminal<CrosstermBackend<std::io::Stdout>>>,
    busy: bool,
    deposit_input: String,
    transfer_draft: TransferDraft,
    storage_draft: StorageDraft,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
enum Mode {
    #[default]
    Normal,
    DepositModal(DepositState),
    LogModal(LogState),
    StoreModal(StoreState),
    QuitModal,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
struct DepositState {
    amount: String,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
struct LogState {
    draft: TransferDraft,
    focus: LogField,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
enum LogField {
    #[default]
    From,
    To,
    Amount,
    Description,
}

impl LogField {
    const ALL: [LogField; 4] = [
        LogField::From,
        LogField::To,
        LogField::Amount,
        LogField::Description,
    ];

    fn label(self) -> &'static str {
        match self {
            LogField::From => "From",
            LogField::To => "To",
            LogField::Amount => "Amount (ETH)",
            LogField::Description => "Description",
        }
    }

    fn next(self) -> Self {
        match self {
            LogField::From => LogField::To,
            LogField::To => LogField::Amount,
            LogField::Amount => LogField::Description,
            LogField::Description => LogField::From,
        }
    }

    fn prev(self) -> Self {
        match self {
            LogField::From => LogField::Description,
            LogField::To => LogField::From,
            LogField::Amount => LogField::To,
            LogField::Description => LogField::Amount,
        }
    }
}

impl LogState {
    fn field(&self, field: LogField) -> &str {
        match field {
            LogField::From => &self.draft.from,
            LogField::To => &self.draft.to,
            LogField::Amount => &self.draft.amount,
            LogField::Description => &self.draft.description,
        }
    }

    fn focused_mut(&mut self) -> &mut String {
        match self.focus {
            LogField::From => &mut self.draft.from,
            LogField::To => &mut self.draft.to,
            LogField::Amount => &mut self.draft.amount,
            LogField::Description => &mut self.draft.description,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
struct StoreState {
    draft: StorageDraft,
    focus: StoreField,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
enum StoreField {
    #[default]
    Chain,
    Amount,
    DataHash,
    Metadata,
}

impl StoreField {
    const ALL: [StoreField; 4] = [
        StoreField::Chain,
        StoreField::Amount,
        StoreField::DataHash,
        StoreField::Metadata,
    ];

    fn label(self) -> &'static str {
        match self {
            StoreField::Chain => "Chain",
            StoreField::Amount => "USDT amount",
            StoreField::DataHash => "Data hash",
            StoreField::Metadata => "Metadata",
        }
    }

    fn next(self) -> Self {
        match self {
            StoreField::Chain => StoreField::Amount,
            StoreField::Amount => StoreField::DataHash,
            StoreField::DataHash => StoreField::Metadata,
            StoreField::Metadata => StoreField::Chain,
        }
    }

    fn prev(self) -> Self {
        match self {
            StoreField::Chain => StoreField::Metadata,
            StoreField::Amount => StoreField::Chain,
            StoreField::DataHash => StoreField::Amount,
            StoreField::Metadata => StoreField::DataHash,
        }
    }
}

impl StoreState {
    fn field(&self, field: StoreField) -> String {
        match field {
            StoreField::Chain => chain_label(self.draft.chain_id),
            StoreField::Amount => self.draft.amount.clone(),
            StoreField::DataHash => self.draft.data_hash.clone(),
            StoreField::Metadata => self.draft.metadata.clone(),
        }
    }

    /// The chain is picked from a fixed list, so it has no text to edit.
    fn focused_mut(&mut self) -> Option<&mut String> {
        match self.focus {
            StoreField::Chain => None,
            StoreField::Amount => Some(&mut self.draft.amount),
            StoreField::DataHash => Some(&mut self.draft.data_hash),
            StoreField::Metadata => Some(&mut self.draft.metadata),
        }
    }

    fn cycle_chain(&mut self, forward: bool) {
        let len = STORAGE_CHAINS.len();
        let idx = STORAGE_CHAINS
            .iter()
            .position(|(id, _)| *id == self.draft.chain_id)
            .unwrap_or(0);
        let idx = if forward { (idx + 1) % len } else { (idx + len - 1) % len };
        self.draft.chain_id = STORAGE_CHAINS[idx].0;
    }
}

fn chain_label(chain_id: u64) -> String {
    match STORAGE_CHAINS.iter().find(|(id, _)| *id == chain_id) {
        Some((id, name)) => format!("< {name} ({id}) >"),
        None => format!("< {chain_id} >"),
    }
}

pub fn terminal_enter(state: &mut UiState) -> Result<()> {
    enable_raw_mode()?;
    crossterm::execute!(
        std::io::stdout(),
        crossterm::terminal::EnterAlternateScreen,
        crossterm::event::EnableMouseCapture
    )?;
    // Create a single persistent Terminal to preserve buffers across draws
    let backend = CrosstermBackend::new(stdout());
    let terminal = Terminal::new(backend)?;
    state.terminal = Some(terminal);
    Ok(())
}

pub fn terminal_exit() -> Result<()> {
    disable_raw_mode()?;
    crossterm::execute!(
        std::io::stdout(),
        crossterm::event::DisableMouseCapture,
        crossterm::terminal::LeaveAlternateScreen
    )?;
    Ok(())
}

pub fn draw(state: &mut UiState, snap: &AppSnapshot) -> Result<()> {
    // keep what the modals prefill from
    state.busy = snap.red_packet_busy || snap.transfer_log_busy || snap.data_storage_busy;
    state.deposit_input = snap.deposit_input.clone();
    state.transfer_draft = snap.transfer_draft.clone();
    state.storage_draft = snap.storage_draft.clone();
    if let Some(mut term) = state.terminal.take() {
        term.draw(|f| ui(f, state, snap))?;
        state.terminal = Some(term);
    }
    Ok(())
}

/// Reads terminal events on a dedicated thread, since crossterm's reader
/// blocks.
pub fn input_event_stream() -> InputEventReceiver {
    let (tx, rx) = mpsc::unbounded_channel();
    std::thread::spawn(move || {
        loop {
            match event::read() {
                Ok(ev) => {
                    if tx.send(ev).is_err() {
                        break;
                    }
                }
                Err(err) => {
                    warn!(?err, "reading terminal input failed");
                    break;
                }
            }
        }
    });
    rx
}

pub async fn next_raw_event(rx: &mut InputEventReceiver) -> Result<Event> {
    rx.recv()
        .await
        .ok_or_else(|| eyre!("terminal input stream closed"))
}

pub fn interpret_event(state: &mut UiState, event: Event) -> Option<UserEvent> {
    let k = match event {
        Event::Key(k) => k,
        Event::Resize(_, _) => return Some(UserEvent::Redraw),
        _ => return None,
    };
    if k.kind != KeyEventKind::Press {
        return None;
    }
    let modal = match &mut state.mode {
        Mode::DepositModal(ds) => Some(deposit_key(ds, k)),
        Mode::LogModal(ls) => Some(log_key(ls, k)),
        Mode::StoreModal(ss) => Some(store_key(ss, k)),
        Mode::QuitModal => {
            return match k.code {
                KeyCode::Char('y') | KeyCode::Char('Y') => Some(UserEvent::Quit),
                KeyCode::Char('n') | KeyCode::Char('N') | KeyCode::Esc => {
                    state.mode = Mode::Normal;
                    Some(UserEvent::Redraw)
                }
                _ => None,
            };
        }
        Mode::Normal => None,
    };
    if let Some(key) = modal {
        return match key {
            ModalKey::Edited => Some(UserEvent::Redraw),
            ModalKey::Cancel => {
                state.mode = Mode::Normal;
                Some(UserEvent::Redraw)
            }
            ModalKey::Confirm(ev) => {
                state.mode = Mode::Normal;
                Some(ev)
            }
            ModalKey::Ignored => None,
        };
    }
    match k.code {
        KeyCode::Esc if state.busy => Some(UserEvent::Abandon),
        KeyCode::Char('q') | KeyCode::Esc => {
            state.mode = Mode::QuitModal;
            Some(UserEvent::Redraw)
        }
        KeyCode::Char('c') => Some(UserEvent::Connect),
        KeyCode::Char('x') => Some(UserEvent::Disconnect),
        KeyCode::Char('r') => Some(UserEvent::Refresh),
        KeyCode::Char('g') => Some(UserEvent::Claim),
        KeyCode::Char('e') => Some(UserEvent::Clear),
        KeyCode::Char('d') => {
            state.mode = Mode::DepositModal(DepositState {
                amount: state.deposit_input.clone(),
            });
            Some(UserEvent::Redraw)
        }
        KeyCode::Char('l') => {
            state.mode = Mode::LogModal(LogState {
                draft: state.transfer_draft.clone(),
                focus: LogField::default(),
            });
            Some(UserEvent::Redraw)
        }
        KeyCode::Char('s') => {
            state.mode = Mode::StoreModal(StoreState {
                draft: state.storage_draft.clone(),
                focus: StoreField::default(),
            });
            Some(UserEvent::Redraw)
        }
        _ => None,
    }
}

enum ModalKey {
    Edited,
    Cancel,
    Confirm(UserEvent),
    Ignored,
}

fn deposit_key(ds: &mut DepositState, k: KeyEvent) -> ModalKey {
    match k.code {
        KeyCode::Esc => ModalKey::Cancel,
        KeyCode::Enter => ModalKey::Confirm(UserEvent::ConfirmDeposit(ds.amount.clone())),
        KeyCode::Backspace => {
            ds.amount.pop();
            ModalKey::Edited
        }
        KeyCode::Char(c) if c.is_ascii_digit() || c == '.' => {
            ds.amount.push(c);
            ModalKey::Edited
        }
        _ => ModalKey::Ignored,
    }
}

fn log_key(ls: &mut LogState, k: KeyEvent) -> ModalKey {
    match k.code {
        KeyCode::Esc => ModalKey::Cancel,
        KeyCode::Tab | KeyCode::Down => {
            ls.focus = ls.focus.next();
            ModalKey::Edited
        }
        KeyCode::BackTab | KeyCode::Up => {
            ls.focus = ls.focus.prev();
            ModalKey::Edited
        }
        KeyCode::Enter => ModalKey::Confirm(UserEvent::ConfirmLog(ls.draft.clone())),
        KeyCode::Backspace => {
            ls.focused_mut().pop();
            ModalKey::Edited
        }
        KeyCode::Char(c) if !c.is_control() => {
            ls.focused_mut().push(c);
            ModalKey::Edited
        }
        _ => ModalKey::Ignored,
    }
}

fn store_key(ss: &mut StoreState, k: KeyEvent) -> ModalKey {
    match k.code {
        KeyCode::Esc => ModalKey::Cancel,
        KeyCode::Tab | KeyCode::Down => {
            ss.focus = ss.focus.next();
            ModalKey::Edited
        }
        KeyCode::BackTab | KeyCode::Up => {
            ss.focus = ss.focus.prev();
            ModalKey::Edited
        }
        KeyCode::Left | KeyCode::Right if ss.focus == StoreField::Chain => {
            ss.cycle_chain(k.code == KeyCode::Right);
            ModalKey::Edited
        }
        KeyCode::Enter => ModalKey::Confirm(UserEvent::ConfirmStore(ss.draft.clone())),
        KeyCode::Backspace => match ss.focused_mut() {
            Some(value) => {
                value.pop();
                ModalKey::Edited
            }
            None => ModalKey::Ignored,
        },
        KeyCode::Char(c) if !c.is_control() => {
            let amount = ss.focus == StoreField::Amount;
            match ss.focused_mut() {
                Some(value) if !amount || c.is_ascii_digit() || c == '.' => {
                    value.push(c);
                    ModalKey::Edited
                }
                _ => ModalKey::Ignored,
            }
        }
        _ => ModalKey::Ignored,
    }
}

fn ui(f: &mut Frame, state: &UiState, snap: &AppSnapshot) {
    // Clear the whole frame to avoid leftover fragments
    f.render_widget(Clear, f.area());
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(5), // wallet
            Constraint::Length(6), // contract
            Constraint::Min(8),    // claims, transfer log, data records
            Constraint::Length(9), // status/errors + help
        ])
        .split(f.area());

    draw_wallet_panel(f, chunks[0], snap);
    draw_contract_panel(f, chunks[1], snap);
    draw_records(f, chunks[2], snap);
    draw_bottom(f, chunks[3], snap);
    draw_modals(f, state);
}

fn draw_wallet_panel(f: &mut Frame, area: Rect, snap: &AppSnapshot) {
    let session = &snap.session;
    let lines = if session.is_connected() {
        vec![
            Line::from(format!(
                "Account: {} | Network: {} | Balance: {} ETH",
                short_address(session.address),
                describe_network(session.network.as_ref()),
                format_eth(session.balance),
            )),
            Line::from(format!("Address: {}", full_address(session.address))),
            Line::styled(
                format!("Endpoint: {}", snap.endpoint),
                Style::default().fg(Color::DarkGray),
            ),
        ]
    } else {
        vec![
            Line::from("Not connected. Press c to connect a wallet."),
            Line::from(format!(
                "Network: {}",
                describe_network(session.network.as_ref())
            )),
            Line::styled(
                format!("Endpoint: {}", snap.endpoint),
                Style::default().fg(Color::DarkGray),
            ),
        ]
    };
    let widget =
        Paragraph::new(lines).block(Block::default().borders(Borders::ALL).title("Wallet"));
    f.render_widget(widget, area);
}

fn draw_contract_panel(f: &mut Frame, area: Rect, snap: &AppSnapshot) {
    let contract = &snap.contract;
    let lines = vec![
        Line::from(format!(
            "Red: {} | Owner: {}",
            full_address(Some(snap.contracts.red_packet)),
            short_address(contract.owner),
        )),
        Line::from(format!(
            "Total balance: {} ETH | Packets left: {} | Equal split: {}",
            format_eth(contract.total_balance),
            contract
                .total_count
                .map(|c| c.to_string())
                .unwrap_or_else(|| String::from("-")),
            format_flag(contract.is_equal),
        )),
        Line::from(format!(
            "DataLogger: {}",
            full_address(Some(snap.contracts.data_logger))
        )),
        action_line("Red packet", snap.red_packet_action.as_ref()),
    ];
    let widget = Paragraph::new(lines)
        .block(Block::default().borders(Borders::ALL).title("Contract"));
    f.render_widget(widget, area);
}

fn action_line(label: &str, action: Option<&PendingAction>) -> Line<'static> {
    match action {
        Some(action) if action.status.is_busy() => Line::styled(
            format!("{label}: {}", action.message),
            Style::default().fg(Color::Yellow),
        ),
        Some(action) if !action.message.is_empty() => Line::styled(
            format!("{label}: last {} {:?}", action.kind, action.status),
            Style::default().fg(Color::DarkGray),
        ),
        _ => Line::styled(
            format!("{label}: idle"),
            Style::default().fg(Color::DarkGray),
        ),
    }
}

fn draw_records(f: &mut Frame, area: Rect, snap: &AppSnapshot) {
    let cols = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage(28),
            Constraint::Percentage(36),
            Constraint::Percentage(36),
        ])
        .split(area);

    let mut claim_lines = Vec::new();
    if snap.claim_records.is_empty() {
        claim_lines.push(Line::styled("None", Style::default().fg(Color::DarkGray)));
    } else {
        for record in &snap.claim_records {
            claim_lines.push(Line::from(format!(
                "{} {} claimed {} ETH",
                format_timestamp(Some(record.timestamp)),
                short_address(Some(record.holder)),
                format_eth(Some(record.amount)),
            )));
        }
    }
    let claims = Paragraph::new(claim_lines)
        .block(Block::default().borders(Borders::ALL).title("Claim Records"));
    f.render_widget(claims, cols[0]);

    let mut log_lines = vec![action_line("Log", snap.transfer_log_action.as_ref())];
    if snap.transfer_records.is_empty() {
        log_lines.push(Line::styled("None", Style::default().fg(Color::DarkGray)));
    } else {
        for record in &snap.transfer_records {
            log_lines.push(Line::from(format!(
                "#{} {} {} -> {} {} ETH",
                record.id,
                format_timestamp(Some(record.timestamp)),
                short_address(Some(record.from)),
                short_address(Some(record.to)),
                format_eth(Some(record.amount)),
            )));
            log_lines.push(Line::styled(
                format!(
                    "    {} (by {})",
                    record.description,
                    short_address(Some(record.submitter))
                ),
                Style::default().fg(Color::DarkGray),
            ));
        }
    }
    let log = Paragraph::new(log_lines)
        .wrap(Wrap { trim: false })
        .block(Block::default().borders(Borders::ALL).title("Transfer Log"));
    f.render_widget(log, cols[1]);

    let mut data_lines = vec![action_line("Store", snap.data_storage_action.as_ref())];
    if snap.data_records.is_empty() {
        data_lines.push(Line::styled("None", Style::default().fg(Color::DarkGray)));
    } else {
        for record in &snap.data_records {
            data_lines.push(Line::from(format!(
                "{} chain {} {} USDT",
                format_timestamp(Some(record.timestamp)),
                record.chain_id,
                format_eth(Some(record.amount)),
            )));
            data_lines.push(Line::styled(
                format!("    hash {} | tx {}", record.data_hash, short_hash(&record.tx_hash.to_string())),
                Style::default().fg(Color::DarkGray),
            ));
            if !record.metadata.is_empty() {
                data_lines.push(Line::styled(
                    format!("    {}", record.metadata),
                    Style::default().fg(Color::DarkGray),
                ));
            }
        }
    }
    let data = Paragraph::new(data_lines)
        .wrap(Wrap { trim: false })
        .block(Block::default().borders(Borders::ALL).title("Data Records"));
    f.render_widget(data, cols[2]);
}

fn short_hash(hash: &str) -> String {
    match (hash.get(..6), hash.len().checked_sub(4).and_then(|i| hash.get(i..))) {
        (Some(head), Some(tail)) if hash.len() > 10 => format!("{head}...{tail}"),
        _ => hash.to_owned(),
    }
}

fn draw_bottom(f: &mut Frame, area: Rect, snap: &AppSnapshot) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(3), Constraint::Length(3)])
        .split(area);

    let status_widget = if snap.errors.is_empty() {
        let mut lines: Vec<Line> = Vec::new();
        if snap.status.trim().is_empty() {
            lines.push(Line::from("Ready"));
        } else {
            for line in snap.status.lines() {
                lines.push(Line::from(line.to_string()));
            }
        }
        Paragraph::new(lines)
            .wrap(Wrap { trim: false })
            .block(Block::default().borders(Borders::ALL).title("Status"))
            .style(Style::default().fg(Color::Green))
    } else {
        let mut lines: Vec<Line> = Vec::new();
        for e in &snap.errors {
            lines.push(Line::from(e.clone()));
        }
        Paragraph::new(lines)
            .wrap(Wrap { trim: false })
            .block(Block::default().borders(Borders::ALL).title("Errors"))
            .style(Style::default().fg(Color::Red))
    };
    f.render_widget(status_widget, chunks[0]);

    let help = Paragraph::new(help_line(snap))
        .block(Block::default().borders(Borders::ALL).title("Help"));
    f.render_widget(help, chunks[1]);
}

fn help_line(snap: &AppSnapshot) -> Line<'static> {
    let busy = snap.red_packet_busy || snap.transfer_log_busy || snap.data_storage_busy;
    let entries = [
        ("c connect", !busy),
        ("x disconnect", !busy),
        ("r refresh", !busy),
        ("g claim", !snap.red_packet_busy),
        ("e clear", !snap.red_packet_busy),
        ("d deposit", !snap.red_packet_busy),
        ("l log transfer", !snap.transfer_log_busy),
        ("s store data", !snap.data_storage_busy),
        ("Esc abandon wait", busy),
        ("q quit", true),
    ];
    let mut spans = Vec::new();
    for (i, (label, enabled)) in entries.into_iter().enumerate() {
        if i > 0 {
            spans.push(Span::raw(" | "));
        }
        let style = if enabled {
            Style::default()
        } else {
            Style::default().fg(Color::DarkGray)
        };
        spans.push(Span::styled(label, style));
    }
    Line::from(spans)
}

fn draw_modals(f: &mut Frame, state: &UiState) {
    match &state.mode {
        Mode::DepositModal(ds) => {
            let area = centered_rect(40, 25, f.area());
            let block = Block::default().borders(Borders::ALL).title("Deposit");
            let prompt = "Amount (ETH): ";
            let p = Paragraph::new(format!(
                "{prompt}{}\nEnter=confirm Esc=cancel digits and . to edit",
                ds.amount
            ));
            f.render_widget(Clear, area);
            f.render_widget(block.clone(), area);
            let inner = block.inner(area);
            f.render_widget(p, inner);
            let x = inner.x + (prompt.width() + ds.amount.width()) as u16;
            f.set_cursor_position((x.min(inner.right().saturating_sub(1)), inner.y));
        }
        Mode::LogModal(ls) => {
            let area = centered_rect(60, 40, f.area());
            let block = Block::default()
                .borders(Borders::ALL)
                .title("Submit Transfer Record");
            let mut lines = Vec::new();
            let mut cursor = None;
            for (row, field) in LogField::ALL.into_iter().enumerate() {
                let focused = field == ls.focus;
                let marker = if focused { ">" } else { " " };
                let prefix = format!("{marker} {:<13}: ", field.label());
                let value = ls.field(field);
                if focused {
                    cursor = Some((prefix.width() + value.width(), row));
                }
                let style = if focused {
                    Style::default()
                        .fg(Color::Yellow)
                        .add_modifier(Modifier::BOLD)
                } else {
                    Style::default()
                };
                lines.push(Line::styled(format!("{prefix}{value}"), style));
            }
            lines.push(Line::from(""));
            lines.push(Line::from("Enter=submit Esc=cancel Tab/↑/↓ move"));
            f.render_widget(Clear, area);
            f.render_widget(block.clone(), area);
            let inner = block.inner(area);
            f.render_widget(Paragraph::new(lines), inner);
            if let Some((col, row)) = cursor {
                let x = inner.x + col as u16;
                f.set_cursor_position((
                    x.min(inner.right().saturating_sub(1)),
                    inner.y + row as u16,
                ));
            }
        }
        Mode::StoreModal(ss) => {
            let area = centered_rect(60, 40, f.area());
            let block = Block::default()
                .borders(Borders::ALL)
                .title("Store Data Record (fee 0.0001 ETH)");
            let mut lines = Vec::new();
            let mut cursor = None;
            for (row, field) in StoreField::ALL.into_iter().enumerate() {
                let focused = field == ss.focus;
                let marker = if focused { ">" } else { " " };
                let prefix = format!("{marker} {:<12}: ", field.label());
                let value = ss.field(field);
                if focused && field != StoreField::Chain {
                    cursor = Some((prefix.width() + value.width(), row));
                }
                let style = if focused {
                    Style::default()
                        .fg(Color::Yellow)
                        .add_modifier(Modifier::BOLD)
                } else {
                    Style::default()
                };
                lines.push(Line::styled(format!("{prefix}{value}"), style));
            }
            lines.push(Line::from(""));
            lines.push(Line::from("Enter=store Esc=cancel Tab/↑/↓ move ←/→ chain"));
            f.render_widget(Clear, area);
            f.render_widget(block.clone(), area);
            let inner = block.inner(area);
            f.render_widget(Paragraph::new(lines), inner);
            if let Some((col, row)) = cursor {
                let x = inner.x + col as u16;
                f.set_cursor_position((
                    x.min(inner.right().saturating_sub(1)),
                    inner.y + row as u16,
                ));
            }
        }
        Mode::QuitModal => {
            let area = centered_rect(40, 20, f.area());
            let block = Block::default().borders(Borders::ALL).title("Confirm Quit");
            let p = Paragraph::new("Quit the playground? (Y/N)");
            f.render_widget(Clear, area);
            f.render_widget(block.clone(), area);
            f.render_widget(p, block.inner(area));
        }
        Mode::Normal => {}
    }
}

fn centered_rect(w_percent: u16, h_percent: u16, r: Rect) -> Rect {
    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - h_percent) / 2),
            Constraint::Percentage(h_percent),
            Constraint::Percentage((100 - h_percent) / 2),
        ])
        .split(r);

    let vertical = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - w_percent) / 2),
            Constraint::Percentage(w_percent),
            Constraint::Percentage((100 - w_percent) / 2),
        ])
        .split(popup_layout[1]);

    vertical[1]
}
