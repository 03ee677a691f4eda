//! SATCHEL interactive dashboard.
//!
//! One tokio event loop owns all view state. Watch chains run as spawned
//! tasks scoped to the current view's cancellation token and report back
//! over an unbounded channel; nothing mutates view state off the loop.

pub mod events;
pub mod render;
pub mod state;

use anyhow::Result;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use crossterm::{
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::backend::CrosstermBackend;
use ratatui::Terminal;
use std::io;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use crate::api::types::Document;
use crate::api::KnowledgeBase;
use crate::ask;
use crate::config::SatchelConfig;
use crate::error::SatchelResult;
use crate::poll::{watch_document, PollPolicy, WatchOutcome, WatchRegistry};
use crate::session::{Session, SessionStore};
use events::EventHandler;
use render::Theme;
use state::{
    AskFocus, AskPanel, ConfirmDelete, DetailState, DocumentsState, LoginForm, Notice, NoticeKind,
    Notices, UploadForm, View,
};

/// Messages from background watch tasks to the event loop.
pub enum AppEvent {
    DocumentObserved(Document),
    WatchFinished {
        doc_id: i64,
        result: SatchelResult<WatchOutcome>,
    },
}

pub struct App {
    config: SatchelConfig,
    session_store: SessionStore,
    backend: Arc<dyn KnowledgeBase>,
    registry: WatchRegistry,
    events_tx: mpsc::UnboundedSender<AppEvent>,
    cancel_root: CancellationToken,
    view_cancel: CancellationToken,

    pub view: View,
    pub session: Session,
    pub theme: Theme,
    pub docs: DocumentsState,
    pub notices: Notices,
    pub login: LoginForm,
    pub upload: Option<UploadForm>,
    pub confirm: Option<ConfirmDelete>,
    pub ask: AskPanel,
    pub detail: Option<DetailState>,
    pub should_quit: bool,
}

impl App {
    pub fn new(
        config: SatchelConfig,
        session_store: SessionStore,
        backend: Arc<dyn KnowledgeBase>,
        events_tx: mpsc::UnboundedSender<AppEvent>,
    ) -> Self {
        let session = session_store.current();
        let theme = Theme::from_name(&session_store.theme());
        let view = if session.is_authenticated() {
            View::Dashboard
        } else {
            View::Login
        };
        let cancel_root = CancellationToken::new();
        let view_cancel = cancel_root.child_token();

        Self {
            config,
            session_store,
            backend,
            registry: WatchRegistry::default(),
            events_tx,
            cancel_root,
            view_cancel,
            view,
            session,
            theme,
            docs: DocumentsState::default(),
            notices: Notices::default(),
            login: LoginForm::default(),
            upload: None,
            confirm: None,
            ask: AskPanel::default(),
            detail: None,
            should_quit: false,
        }
    }

    pub fn is_watching(&self, doc_id: i64) -> bool {
        self.registry.is_watching(doc_id)
    }

    fn notice_ttl(&self) -> Duration {
        Duration::from_millis(self.config.polling.notice_ttl_ms)
    }

    pub async fn bootstrap(&mut self) {
        if self.session.is_authenticated() {
            self.refresh_docs().await;
        }
    }

    /// Expire transient notices. Called once per loop iteration.
    pub fn tick(&mut self) {
        self.notices.prune(Instant::now());
    }

    /// Tear down the current view's watch chains before leaving it, so no
    /// stale update can land after the view is gone.
    fn cancel_view_tasks(&mut self) {
        self.view_cancel.cancel();
        self.view_cancel = self.cancel_root.child_token();
    }

    pub fn shutdown(&mut self) {
        self.cancel_root.cancel();
    }

    async fn refresh_docs(&mut self) {
        let result = self.backend.list_documents().await;
        match result {
            Ok(docs) => {
                self.docs.set_all(docs);
                self.ask.set_documents(&self.docs.docs);
            }
            Err(err) => {
                error!("failed to load documents: {}", err);
                self.notices.push(Notice::persistent(
                    "Failed to load documents. Check your API server and token.",
                    NoticeKind::Error,
                ));
            }
        }
    }

    async fn goto_dashboard(&mut self) {
        self.cancel_view_tasks();
        self.notices.clear();
        self.confirm = None;
        self.upload = None;
        self.detail = None;
        self.view = View::Dashboard;
        self.refresh_docs().await;
    }

    async fn goto_detail(&mut self, doc_id: i64) {
        self.cancel_view_tasks();
        self.notices.clear();
        self.confirm = None;
        self.view = View::Detail;
        self.detail = Some(DetailState { doc_id, doc: None });
        let result = self.backend.get_document(doc_id).await;
        match result {
            Ok(doc) => {
                if let Some(detail) = &mut self.detail {
                    detail.doc = Some(doc);
                }
            }
            Err(err) => {
                self.notices
                    .push(Notice::persistent(err.user_message(), NoticeKind::Error));
            }
        }
    }

    async fn goto_ask(&mut self) {
        self.cancel_view_tasks();
        self.notices.clear();
        self.confirm = None;
        self.view = View::Ask;
        self.refresh_docs().await;
    }

    fn logout(&mut self) {
        let result = self.session_store.logout();
        self.cancel_view_tasks();
        self.session = Session::default();
        self.docs = DocumentsState::default();
        self.ask = AskPanel::default();
        self.detail = None;
        self.confirm = None;
        self.upload = None;
        self.notices.clear();
        self.login = LoginForm::default();
        self.view = View::Login;
        if let Err(err) = result {
            self.notices
                .push(Notice::persistent(err.user_message(), NoticeKind::Error));
        }
    }

    async fn submit_login(&mut self) {
        if self.login.busy {
            return;
        }
        let username = self.login.username.trim().to_string();
        let password = self.login.password.clone();
        if username.is_empty() || password.is_empty() {
            self.login.error = Some("Enter a username and password.".to_string());
            return;
        }

        self.login.busy = true;
        let result = self.backend.login(&username, &password).await;
        match result {
            Ok(token) => match self.session_store.login(&token, &username) {
                Ok(session) => {
                    info!("signed in as {}", session.username);
                    self.session = session;
                    self.login = LoginForm::default();
                    self.goto_dashboard().await;
                }
                Err(err) => {
                    self.login.busy = false;
                    self.login.error = Some(err.user_message());
                }
            },
            Err(err) => {
                self.login.busy = false;
                self.login.error = Some(err.user_message());
            }
        }
    }

    /// Start an indexing job and watch it. A second start for a document
    /// that is already being watched is ignored (first wins).
    async fn start_index(&mut self, doc_id: i64) {
        let Some(guard) = self.registry.begin(doc_id) else {
            return;
        };

        let result = self.backend.start_indexing(doc_id).await;
        match result {
            Ok(accepted) => {
                info!("indexing job {} accepted for doc {}", accepted.job_id, doc_id);
                self.notices.push(Notice::transient(
                    "Indexing started. You will be notified when it finishes.",
                    NoticeKind::Info,
                    self.notice_ttl(),
                ));

                let backend = Arc::clone(&self.backend);
                let tx = self.events_tx.clone();
                let cancel = self.view_cancel.child_token();
                let policy = PollPolicy::from_config(&self.config.polling);
                tokio::spawn(async move {
                    let _guard = guard;
                    let observer = tx.clone();
                    let result = watch_document(backend.as_ref(), doc_id, policy, &cancel, {
                        move |doc| {
                            let _ = observer.send(AppEvent::DocumentObserved(doc.clone()));
                        }
                    })
                    .await;
                    let _ = tx.send(AppEvent::WatchFinished { doc_id, result });
                });
            }
            Err(err) => {
                self.notices.push(Notice::persistent(
                    format!("Failed to start indexing: {}", err.user_message()),
                    NoticeKind::Error,
                ));
            }
        }
    }

    pub fn apply_event(&mut self, event: AppEvent) {
        match event {
            AppEvent::DocumentObserved(doc) => self.absorb_document(doc),
            AppEvent::WatchFinished { doc_id: _, result } => match result {
                Ok(outcome) => {
                    let (kind, doc) = match &outcome {
                        WatchOutcome::Indexed(doc) => (Some(NoticeKind::Success), Some(doc.clone())),
                        WatchOutcome::Failed { document, .. } => {
                            (Some(NoticeKind::Error), Some(document.clone()))
                        }
                        WatchOutcome::StillIndexing(doc) => {
                            (Some(NoticeKind::Info), Some(doc.clone()))
                        }
                        WatchOutcome::Cancelled => (None, None),
                    };
                    if let Some(doc) = doc {
                        self.absorb_document(doc);
                    }
                    if let (Some(kind), Some(text)) = (kind, outcome.describe()) {
                        let notice = match kind {
                            // Success toasts clear any earlier error and fade out.
                            NoticeKind::Success => {
                                self.notices.clear();
                                Notice::transient(text, kind, self.notice_ttl())
                            }
                            _ => Notice::persistent(text, kind),
                        };
                        self.notices.push(notice);
                    }
                }
                Err(err) => {
                    self.notices
                        .push(Notice::persistent(err.user_message(), NoticeKind::Error));
                }
            },
        }
    }

    fn absorb_document(&mut self, doc: Document) {
        if let Some(detail) = &mut self.detail {
            if detail.doc_id == doc.id {
                detail.doc = Some(doc.clone());
            }
        }
        self.docs.upsert(doc);
        self.ask.set_documents(&self.docs.docs);
    }

    async fn submit_upload(&mut self) {
        let (title, path) = match &self.upload {
            Some(form) => (form.title.trim().to_string(), form.path.trim().to_string()),
            None => return,
        };
        if title.is_empty() || path.is_empty() {
            if let Some(form) = &mut self.upload {
                form.error = Some("Provide a title and file before uploading.".to_string());
            }
            return;
        }

        if let Some(form) = &mut self.upload {
            form.busy = true;
            form.error = None;
        }

        let bytes = match tokio::fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(err) => {
                if let Some(form) = &mut self.upload {
                    form.busy = false;
                    form.error = Some(format!("Could not read {}: {}", path, err));
                }
                return;
            }
        };
        let file_name = std::path::Path::new(&path)
            .file_name()
            .map(|name| name.to_string_lossy().to_string())
            .unwrap_or_else(|| path.clone());

        let result = self.backend.upload_document(&title, &file_name, bytes).await;
        match result {
            Ok(doc) => {
                info!("uploaded document {} ({})", doc.id, doc.title);
                self.upload = None;
                self.notices.push(Notice::transient(
                    "Upload complete. Start indexing when ready.",
                    NoticeKind::Success,
                    self.notice_ttl(),
                ));
                self.refresh_docs().await;
            }
            Err(err) => {
                if let Some(form) = &mut self.upload {
                    form.busy = false;
                    form.error = Some(err.user_message());
                }
            }
        }
    }

    async fn confirm_delete(&mut self) {
        let Some(confirm) = self.confirm.take() else {
            return;
        };
        let result = self.backend.delete_document(confirm.doc_id).await;
        match result {
            Ok(()) => {
                self.docs.remove(confirm.doc_id);
                self.ask.set_documents(&self.docs.docs);
                self.notices.push(Notice::transient(
                    "Document removed from the knowledge base.",
                    NoticeKind::Success,
                    self.notice_ttl(),
                ));
                if self.view == View::Detail {
                    self.goto_dashboard().await;
                }
            }
            Err(err) => {
                self.notices.push(Notice::persistent(
                    format!("Delete failed: {}", err.user_message()),
                    NoticeKind::Error,
                ));
            }
        }
    }

    async fn submit_ask(&mut self) {
        if self.ask.busy {
            return;
        }
        let form = self.ask.to_form();
        self.ask.busy = true;
        self.ask.response = None;
        self.ask.expanded_sources.clear();

        let result = ask::submit(&form, self.backend.as_ref()).await;
        self.ask.busy = false;
        match result {
            Ok(response) => {
                self.notices.clear();
                self.ask.response = Some(response);
            }
            Err(err) => {
                self.notices
                    .push(Notice::persistent(err.user_message(), NoticeKind::Error));
            }
        }
    }

    fn toggle_theme(&mut self) {
        self.theme = self.theme.toggled();
        if let Err(err) = self.session_store.set_theme(self.theme.name()) {
            error!("failed to persist theme: {}", err);
        }
    }

    pub async fn handle_key(&mut self, key: KeyEvent) {
        if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
            self.should_quit = true;
            return;
        }

        if self.confirm.is_some() {
            self.handle_confirm_key(key).await;
            return;
        }
        if self.upload.is_some() {
            self.handle_upload_key(key).await;
            return;
        }

        match self.view {
            View::Login => self.handle_login_key(key).await,
            View::Dashboard => self.handle_dashboard_key(key).await,
            View::Detail => self.handle_detail_key(key).await,
            View::Ask => self.handle_ask_key(key).await,
        }
    }

    async fn handle_confirm_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Char('y') | KeyCode::Char('Y') => self.confirm_delete().await,
            KeyCode::Char('n') | KeyCode::Char('N') | KeyCode::Esc => {
                self.confirm = None;
            }
            _ => {}
        }
    }

    async fn handle_upload_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Esc => self.upload = None,
            KeyCode::Tab | KeyCode::BackTab => {
                if let Some(form) = &mut self.upload {
                    form.toggle_focus();
                }
            }
            KeyCode::Enter => self.submit_upload().await,
            KeyCode::Backspace => {
                if let Some(form) = &mut self.upload {
                    form.active_input().pop();
                }
            }
            KeyCode::Char(c) => {
                if let Some(form) = &mut self.upload {
                    form.active_input().push(c);
                }
            }
            _ => {}
        }
    }

    async fn handle_login_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Esc => self.should_quit = true,
            KeyCode::Tab | KeyCode::BackTab | KeyCode::Up | KeyCode::Down => {
                self.login.toggle_focus();
            }
            KeyCode::Enter => self.submit_login().await,
            KeyCode::Backspace => {
                self.login.active_input().pop();
            }
            KeyCode::Char(c) => {
                self.login.active_input().push(c);
            }
            _ => {}
        }
    }

    async fn handle_dashboard_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Char('q') => self.should_quit = true,
            KeyCode::Char('r') => self.refresh_docs().await,
            KeyCode::Char('u') => self.upload = Some(UploadForm::default()),
            KeyCode::Char('a') => self.goto_ask().await,
            KeyCode::Char('t') => self.toggle_theme(),
            KeyCode::Char('L') => self.logout(),
            KeyCode::Up | KeyCode::Char('k') => self.docs.select_prev(),
            KeyCode::Down | KeyCode::Char('j') => self.docs.select_next(),
            KeyCode::Char('i') => {
                if let Some(doc) = self.docs.selected_doc() {
                    let id = doc.id;
                    self.start_index(id).await;
                }
            }
            KeyCode::Char('d') => {
                if let Some(doc) = self.docs.selected_doc() {
                    self.confirm = Some(ConfirmDelete {
                        doc_id: doc.id,
                        title: doc.title.clone(),
                    });
                }
            }
            KeyCode::Enter => {
                if let Some(doc) = self.docs.selected_doc() {
                    let id = doc.id;
                    self.goto_detail(id).await;
                }
            }
            _ => {}
        }
    }

    async fn handle_detail_key(&mut self, key: KeyEvent) {
        let doc_id = self.detail.as_ref().map(|detail| detail.doc_id);
        match key.code {
            KeyCode::Char('q') => self.should_quit = true,
            KeyCode::Esc | KeyCode::Char('b') => self.goto_dashboard().await,
            KeyCode::Char('a') => self.goto_ask().await,
            KeyCode::Char('t') => self.toggle_theme(),
            KeyCode::Char('L') => self.logout(),
            KeyCode::Char('r') => {
                if let Some(id) = doc_id {
                    self.goto_detail(id).await;
                }
            }
            KeyCode::Char('i') => {
                if let Some(id) = doc_id {
                    self.start_index(id).await;
                }
            }
            KeyCode::Char('d') => {
                if let Some(detail) = &self.detail {
                    let title = detail
                        .doc
                        .as_ref()
                        .map(|doc| doc.title.clone())
                        .unwrap_or_default();
                    self.confirm = Some(ConfirmDelete {
                        doc_id: detail.doc_id,
                        title,
                    });
                }
            }
            _ => {}
        }
    }

    async fn handle_ask_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Esc => self.goto_dashboard().await,
            KeyCode::Tab => self.ask.focus = self.ask.focus.next(),
            KeyCode::Enter => self.submit_ask().await,
            KeyCode::Up => {
                if self.ask.focus == AskFocus::Picker {
                    self.ask.picker_index = self.ask.picker_index.saturating_sub(1);
                }
            }
            KeyCode::Down => {
                if self.ask.focus == AskFocus::Picker
                    && self.ask.picker_index + 1 < self.ask.picker.len()
                {
                    self.ask.picker_index += 1;
                }
            }
            KeyCode::Char(' ') => match self.ask.focus {
                AskFocus::SearchAll => self.ask.search_all = !self.ask.search_all,
                AskFocus::Explain => self.ask.explain = !self.ask.explain,
                AskFocus::Picker => self.ask.toggle_picked(),
                AskFocus::Question => self.ask.question.push(' '),
                AskFocus::TopK => {}
            },
            KeyCode::Backspace => match self.ask.focus {
                AskFocus::Question => {
                    self.ask.question.pop();
                }
                AskFocus::TopK => {
                    self.ask.top_k_input.pop();
                }
                _ => {}
            },
            KeyCode::Char(c) if c.is_ascii_digit() && self.ask.focus == AskFocus::TopK => {
                self.ask.top_k_input.push(c);
            }
            KeyCode::Char(c) if self.ask.focus == AskFocus::Question => {
                self.ask.question.push(c);
            }
            KeyCode::Char(c) if c.is_ascii_digit() => {
                // Toggle source expansion with 1..9 from anywhere else.
                if let Some(index) = c.to_digit(10) {
                    if index >= 1 {
                        self.ask.toggle_source((index - 1) as usize);
                    }
                }
            }
            _ => {}
        }
    }
}

/// Entry point for the interactive dashboard.
pub async fn run(
    config: SatchelConfig,
    session_store: SessionStore,
    backend: Arc<dyn KnowledgeBase>,
) -> Result<()> {
    info!("starting SATCHEL dashboard");

    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let term_backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(term_backend)?;

    let (events_tx, mut events_rx) = mpsc::unbounded_channel();
    let mut app = App::new(config, session_store, backend, events_tx);
    app.bootstrap().await;
    let mut handler = EventHandler::new();

    let result = run_loop(&mut terminal, &mut app, &mut handler, &mut events_rx).await;

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    if let Err(err) = &result {
        error!("dashboard error: {:?}", err);
    } else {
        info!("dashboard shut down");
    }
    result
}

async fn run_loop(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    app: &mut App,
    handler: &mut EventHandler,
    events_rx: &mut mpsc::UnboundedReceiver<AppEvent>,
) -> Result<()> {
    loop {
        terminal.draw(|frame| render::draw(frame, app))?;

        while let Ok(event) = events_rx.try_recv() {
            app.apply_event(event);
        }
        app.tick();

        if let Some(key) = handler.poll_key()? {
            app.handle_key(key).await;
        }

        if app.should_quit {
            app.shutdown();
            break;
        }
    }
    Ok(())
}
