//! Dashboard state and navigation

use std::time::{Duration, Instant};

use anyhow::Result;
use chrono::Utc;
use serde_json::Value;

use courtline_core::models::{AuditLog, Case, Contact, Message};
use courtline_core::reports::{self, Report};
use courtline_core::{inbox, Store};

use crate::output::{display_value, Tabular};

/// Input mode for the application
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputMode {
    /// Normal navigation mode
    Normal,
    /// Filter/search mode (after pressing /)
    Filter,
}

/// Which pane has focus
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActivePane {
    Items,
    Detail,
}

impl ActivePane {
    pub fn toggle(self) -> Self {
        match self {
            ActivePane::Items => ActivePane::Detail,
            ActivePane::Detail => ActivePane::Items,
        }
    }
}

/// Dashboard tabs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tab {
    Cases,
    Contacts,
    Inbox,
    Outbox,
    Audit,
}

impl Tab {
    pub const ALL: [Tab; 5] = [Tab::Cases, Tab::Contacts, Tab::Inbox, Tab::Outbox, Tab::Audit];

    pub fn title(self) -> &'static str {
        match self {
            Tab::Cases => "Cases",
            Tab::Contacts => "Contacts",
            Tab::Inbox => "Inbox",
            Tab::Outbox => "Outbox",
            Tab::Audit => "Audit",
        }
    }

    pub fn index(self) -> usize {
        Tab::ALL.iter().position(|t| *t == self).unwrap_or(0)
    }

    /// Move to the next tab (wrapping)
    pub fn next(self) -> Self {
        Tab::ALL[(self.index() + 1) % Tab::ALL.len()]
    }

    /// Move to the previous tab (wrapping)
    pub fn prev(self) -> Self {
        Tab::ALL[(self.index() + Tab::ALL.len() - 1) % Tab::ALL.len()]
    }
}

/// One list row plus what the detail pane shows for it
#[derive(Debug, Clone)]
pub struct Entry {
    pub columns: Vec<String>,
    pub detail: Vec<(String, String)>,
    search: String,
}

impl Entry {
    fn from_record<T: Tabular>(record: &T) -> Self {
        let columns = record.row();
        let detail: Vec<(String, String)> = match serde_json::to_value(record) {
            Ok(Value::Object(fields)) => fields
                .iter()
                .filter(|(_, v)| !v.is_null())
                .map(|(k, v)| (k.clone(), display_value(v)))
                .collect(),
            _ => Vec::new(),
        };
        let search = detail
            .iter()
            .map(|(_, v)| v.to_lowercase())
            .collect::<Vec<_>>()
            .join("\n");
        Self {
            columns,
            detail,
            search,
        }
    }

    pub fn matches(&self, filter: &str) -> bool {
        let filter = filter.trim().to_lowercase();
        filter.is_empty() || self.search.contains(&filter)
    }
}

/// Rows for one tab
#[derive(Debug, Clone, Default)]
pub struct TabData {
    pub headers: &'static [&'static str],
    pub entries: Vec<Entry>,
}

impl TabData {
    fn from_records<T: Tabular>(records: &[T]) -> Self {
        Self {
            headers: T::HEADERS,
            entries: records.iter().map(Entry::from_record).collect(),
        }
    }
}

/// Application state
pub struct App {
    /// Whether the app should exit
    pub should_quit: bool,
    pub input_mode: InputMode,
    pub active_pane: ActivePane,
    pub tab: Tab,
    /// Loaded rows, indexed like [`Tab::ALL`]
    pub data: Vec<TabData>,
    /// Selected row per tab
    pub selected: [usize; 5],
    /// Filter text for real-time filtering
    pub filter_text: String,
    /// Scroll offset for detail pane
    pub detail_scroll: u16,
    pub report: Report,
    /// Status message to display temporarily
    pub status_message: Option<String>,
    /// When the status message was set (for auto-dismiss)
    pub status_message_time: Option<Instant>,
    /// Whether help overlay is visible
    pub show_help: bool,
    /// Pending 'g' keypress for gg sequence (with timestamp)
    pub pending_g: Option<Instant>,
}

impl App {
    /// Create a new app with data from store
    pub fn new(store: &Store) -> Result<Self> {
        let mut app = Self {
            should_quit: false,
            input_mode: InputMode::Normal,
            active_pane: ActivePane::Items,
            tab: Tab::Cases,
            data: vec![TabData::default(); Tab::ALL.len()],
            selected: [0; 5],
            filter_text: String::new(),
            detail_scroll: 0,
            report: Report::default(),
            status_message: None,
            status_message_time: None,
            show_help: false,
            pending_g: None,
        };
        app.refresh(store)?;
        Ok(app)
    }

    /// Reload every tab and the summary counters
    pub fn refresh(&mut self, store: &Store) -> Result<()> {
        let now = Utc::now();

        let mut cases: Vec<Case> = store.get_all()?;
        cases.sort_by(|a, b| a.docket_number.cmp(&b.docket_number));
        let mut contacts: Vec<Contact> = store.get_all()?;
        contacts.sort_by(|a, b| (&a.last_name, &a.first_name).cmp(&(&b.last_name, &b.first_name)));
        let mut outbox: Vec<Message> = store.get_all()?;
        outbox.sort_by_key(|m| m.scheduled_for);
        let mut audit: Vec<AuditLog> = store.get_all()?;
        audit.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));

        self.data = vec![
            TabData::from_records(&cases),
            TabData::from_records(&contacts),
            TabData::from_records(&inbox::list(store, "", None)?),
            TabData::from_records(&outbox),
            TabData::from_records(&audit),
        ];
        self.report = reports::generate(store, now)?;
        self.clamp_selection();
        Ok(())
    }

    /// Set a status message (auto-dismissed after 3 seconds)
    pub fn set_status(&mut self, message: impl Into<String>) {
        self.status_message = Some(message.into());
        self.status_message_time = Some(Instant::now());
    }

    /// Check and clear expired status message
    pub fn check_status_timeout(&mut self) {
        if let Some(time) = self.status_message_time {
            if time.elapsed() > Duration::from_secs(3) {
                self.status_message = None;
                self.status_message_time = None;
            }
        }
    }

    pub fn toggle_help(&mut self) {
        self.show_help = !self.show_help;
    }

    pub fn current_data(&self) -> &TabData {
        &self.data[self.tab.index()]
    }

    /// Entries of the current tab that pass the filter
    pub fn visible(&self) -> Vec<&Entry> {
        self.current_data()
            .entries
            .iter()
            .filter(|e| e.matches(&self.filter_text))
            .collect()
    }

    pub fn selected_index(&self) -> usize {
        self.selected[self.tab.index()]
    }

    pub fn current_entry(&self) -> Option<&Entry> {
        self.visible().get(self.selected_index()).copied()
    }

    fn set_selected(&mut self, index: usize) {
        self.selected[self.tab.index()] = index;
        self.detail_scroll = 0;
    }

    fn clamp_selection(&mut self) {
        let last = self.visible().len().saturating_sub(1);
        if self.selected_index() > last {
            self.set_selected(last);
        }
    }

    pub fn next_tab(&mut self) {
        self.tab = self.tab.next();
        self.clear_filter();
    }

    pub fn prev_tab(&mut self) {
        self.tab = self.tab.prev();
        self.clear_filter();
    }

    pub fn toggle_pane(&mut self) {
        self.active_pane = self.active_pane.toggle();
    }

    /// Move selection up in the current pane
    pub fn move_up(&mut self) {
        match self.active_pane {
            ActivePane::Items => {
                let index = self.selected_index();
                if index > 0 {
                    self.set_selected(index - 1);
                }
            }
            ActivePane::Detail => {
                self.detail_scroll = self.detail_scroll.saturating_sub(1);
            }
        }
    }

    /// Move selection down in the current pane
    pub fn move_down(&mut self) {
        match self.active_pane {
            ActivePane::Items => {
                let index = self.selected_index();
                if index + 1 < self.visible().len() {
                    self.set_selected(index + 1);
                }
            }
            ActivePane::Detail => {
                self.detail_scroll = self.detail_scroll.saturating_add(1);
            }
        }
    }

    /// Move to first item (vim 'gg')
    pub fn move_to_first(&mut self) {
        match self.active_pane {
            ActivePane::Items => self.set_selected(0),
            ActivePane::Detail => self.detail_scroll = 0,
        }
    }

    /// Move to last item (vim 'G')
    pub fn move_to_last(&mut self) {
        match self.active_pane {
            ActivePane::Items => {
                let last = self.visible().len().saturating_sub(1);
                self.set_selected(last);
            }
            ActivePane::Detail => {
                let lines = self.current_entry().map_or(0, |e| e.detail.len());
                self.detail_scroll = lines.saturating_sub(1).min(u16::MAX as usize) as u16;
            }
        }
    }

    pub fn enter_filter_mode(&mut self) {
        self.input_mode = InputMode::Filter;
    }

    pub fn exit_filter_mode(&mut self) {
        self.input_mode = InputMode::Normal;
    }

    pub fn clear_filter(&mut self) {
        self.filter_text.clear();
        self.clamp_selection();
    }

    pub fn push_filter_char(&mut self, c: char) {
        self.filter_text.push(c);
        self.set_selected(0);
    }

    pub fn pop_filter_char(&mut self) {
        self.filter_text.pop();
        self.set_selected(0);
    }
}
