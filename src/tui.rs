use crate::api::{ApiClient, EntryKind};
use crate::auth::{self, LoginFlow, LoginState, SignupFlow, SignupState};
use crate::browser::{Browser, DeleteTarget, Effect, Overlay};
use crate::config::Config;
use crate::format;
use crossterm::{
    event::{self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEventKind},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout},
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::Paragraph,
    Frame, Terminal,
};
use std::io;
use std::time::Instant;

#[derive(Clone, Copy, PartialEq)]
enum Screen {
    Login,
    Signup,
    Browser,
}

#[derive(Clone, Copy, PartialEq)]
enum SignupFocus {
    Password,
    Confirm,
}

struct App {
    screen: Screen,
    server: String,
    login: LoginFlow,
    signup: SignupFlow,
    signup_focus: SignupFocus,
    signup_redirect: Option<Instant>,
    browser: Browser,
}

impl App {
    fn new(config: &Config, start_at_login: bool) -> Self {
        Self {
            screen: if start_at_login {
                Screen::Login
            } else {
                Screen::Browser
            },
            server: config
                .server_url
                .clone()
                .unwrap_or_else(|| crate::api::DEFAULT_SERVER.to_string()),
            login: LoginFlow::new(),
            signup: SignupFlow::new(),
            signup_focus: SignupFocus::Password,
            signup_redirect: None,
            browser: Browser::new(),
        }
    }

    fn goto_login(&mut self) {
        self.login = LoginFlow::new();
        self.screen = Screen::Login;
    }

    fn goto_signup(&mut self) {
        self.signup = SignupFlow::new();
        self.signup_focus = SignupFocus::Password;
        self.signup_redirect = None;
        self.screen = Screen::Signup;
    }

    fn goto_browser(&mut self) {
        self.browser = Browser::new();
        self.screen = Screen::Browser;
    }
}

pub async fn run(mut config: Config, start_at_login: bool) -> anyhow::Result<()> {
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let result = run_app(&mut terminal, &mut config, start_at_login).await;

    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    result
}

async fn run_app(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    config: &mut Config,
    start_at_login: bool,
) -> anyhow::Result<()> {
    let mut api = ApiClient::from_config(config);
    let mut app = App::new(config, start_at_login);

    loop {
        terminal.draw(|f| ui(f, &app))?;

        // Screen work that does not wait for a key
        match app.screen {
            Screen::Login if app.login.state == LoginState::Submitting => {
                let result = api.login(auth::ACCOUNT_NAME, &app.login.password).await;
                app.login.on_response(result);
                if app.login.state == LoginState::Done {
                    config.username = Some(auth::ACCOUNT_NAME.to_string());
                    config.token = app.login.token.clone();
                    config.save()?;
                    api = ApiClient::from_config(config);
                    app.goto_browser();
                }
                continue;
            }
            Screen::Signup => {
                if app.signup.state == SignupState::Submitting {
                    let result = api.signup(auth::ACCOUNT_NAME, &app.signup.password).await;
                    app.signup.on_response(result);
                    if app.signup.state == SignupState::Complete {
                        app.signup_redirect = Some(Instant::now() + auth::SIGNUP_REDIRECT_DELAY);
                    }
                    continue;
                }
                if let Some(at) = app.signup_redirect {
                    if Instant::now() >= at {
                        app.goto_login();
                        continue;
                    }
                }
            }
            Screen::Browser => {
                let effects = app.browser.take_effects();
                if !effects.is_empty() {
                    for effect in effects {
                        match effect {
                            Effect::FetchListing { seq, path } => {
                                let result = api.list(&path).await.map_err(|e| e.to_string());
                                app.browser.on_listing(seq, result);
                            }
                            Effect::DeleteFile { id } => {
                                let result =
                                    api.delete_file(id).await.map_err(|e| e.to_string());
                                app.browser.on_delete_result(result);
                            }
                            Effect::DeleteFolder { path } => {
                                let result =
                                    api.delete_folder(&path).await.map_err(|e| e.to_string());
                                app.browser.on_delete_result(result);
                            }
                        }
                    }
                    continue;
                }
            }
            _ => {}
        }

        if event::poll(std::time::Duration::from_millis(100))? {
            if let Event::Key(key) = event::read()? {
                if key.kind != KeyEventKind::Press {
                    continue;
                }

                match app.screen {
                    Screen::Login => match key.code {
                        KeyCode::Esc => return Ok(()),
                        KeyCode::Tab => app.goto_signup(),
                        KeyCode::Enter => {
                            app.login.submit();
                        }
                        KeyCode::Char(c) => {
                            app.login.error = None;
                            app.login.password.push(c);
                        }
                        KeyCode::Backspace => {
                            app.login.error = None;
                            app.login.password.pop();
                        }
                        _ => {}
                    },
                    Screen::Signup => {
                        if app.signup.state == SignupState::Complete {
                            // skip the lingering completion screen
                            if matches!(key.code, KeyCode::Enter | KeyCode::Esc) {
                                app.goto_login();
                            }
                            continue;
                        }
                        match key.code {
                            KeyCode::Esc => app.goto_login(),
                            KeyCode::Tab => {
                                app.signup_focus = match app.signup_focus {
                                    SignupFocus::Password => SignupFocus::Confirm,
                                    SignupFocus::Confirm => SignupFocus::Password,
                                };
                            }
                            KeyCode::Enter => {
                                app.signup.submit();
                            }
                            KeyCode::Char(c) => {
                                app.signup.error = None;
                                match app.signup_focus {
                                    SignupFocus::Password => app.signup.password.push(c),
                                    SignupFocus::Confirm => app.signup.confirm.push(c),
                                }
                            }
                            KeyCode::Backspace => {
                                app.signup.error = None;
                                match app.signup_focus {
                                    SignupFocus::Password => {
                                        app.signup.password.pop();
                                    }
                                    SignupFocus::Confirm => {
                                        app.signup.confirm.pop();
                                    }
                                }
                            }
                            _ => {}
                        }
                    }
                    Screen::Browser => {
                        let overlay = app.browser.overlay.clone();
                        match overlay {
                            Overlay::None => match key.code {
                                KeyCode::Char('q') | KeyCode::Esc => return Ok(()),
                                KeyCode::Down | KeyCode::Char('j') => app.browser.down(),
                                KeyCode::Up | KeyCode::Char('k') => app.browser.up(),
                                KeyCode::Enter => app.browser.activate(),
                                KeyCode::Backspace | KeyCode::Left => app.browser.go_parent(),
                                KeyCode::Char('d') => app.browser.request_delete(),
                                KeyCode::Char('r') => app.browser.refresh(),
                                KeyCode::Char(c @ '0'..='9') => {
                                    app.browser.go_crumb(c as usize - '0' as usize)
                                }
                                _ => {}
                            },
                            Overlay::Detail(_) => match key.code {
                                KeyCode::Char('d') => app.browser.request_delete(),
                                KeyCode::Esc | KeyCode::Enter | KeyCode::Char('q') => {
                                    app.browser.dismiss()
                                }
                                _ => {}
                            },
                            Overlay::ConfirmDelete(_) => match key.code {
                                KeyCode::Char('y') | KeyCode::Enter => {
                                    app.browser.confirm_delete()
                                }
                                KeyCode::Char('n') | KeyCode::Esc => app.browser.dismiss(),
                                _ => {}
                            },
                            Overlay::Error(_) => match key.code {
                                KeyCode::Esc | KeyCode::Enter => app.browser.dismiss(),
                                _ => {}
                            },
                        }
                    }
                }
            }
        }
    }
}

fn ui(f: &mut Frame, app: &App) {
    let area = f.area();

    let layout = Layout::default()
        .direction(Direction::Vertical)
        .margin(1)
        .constraints([Constraint::Min(0)])
        .split(area);

    let mut lines: Vec<Line> = vec![
        Line::from(Span::styled(
            "locker",
            Style::default().add_modifier(Modifier::BOLD),
        )),
        Line::from(""),
    ];

    match app.screen {
        Screen::Login => login_ui(&mut lines, app),
        Screen::Signup => signup_ui(&mut lines, app),
        Screen::Browser => browser_ui(&mut lines, app),
    }

    let paragraph = Paragraph::new(lines);
    f.render_widget(paragraph, layout[0]);
}

fn login_ui(lines: &mut Vec<Line>, app: &App) {
    lines.push(Line::from(format!("* server: {}", app.server)));
    lines.push(Line::from(""));
    lines.push(Line::from("login"));
    lines.push(Line::from(""));
    lines.push(Line::from(format!("  account: {}", auth::ACCOUNT_NAME)));
    lines.push(Line::from(format!(
        "> password: {}_",
        "*".repeat(app.login.password.len())
    )));
    if let Some(err) = &app.login.error {
        lines.push(Line::from(format!("  ! {}", err)));
    }
    lines.push(Line::from(""));
    if app.login.state == LoginState::Submitting {
        lines.push(Line::from("logging in..."));
    } else {
        lines.push(Line::from(
            "[enter] login  [tab] create account  [esc] quit",
        ));
    }
}

fn signup_ui(lines: &mut Vec<Line>, app: &App) {
    lines.push(Line::from(format!("* server: {}", app.server)));
    lines.push(Line::from(""));
    lines.push(Line::from("create account"));
    lines.push(Line::from(""));
    lines.push(Line::from(format!("  account: {}", auth::ACCOUNT_NAME)));

    let password_marker = if app.signup_focus == SignupFocus::Password {
        ">"
    } else {
        " "
    };
    let confirm_marker = if app.signup_focus == SignupFocus::Confirm {
        ">"
    } else {
        " "
    };
    lines.push(Line::from(format!(
        "{} password: {}_",
        password_marker,
        "*".repeat(app.signup.password.len())
    )));
    lines.push(Line::from(format!(
        "{} password (repeat): {}_",
        confirm_marker,
        "*".repeat(app.signup.confirm.len())
    )));
    if let Some(err) = &app.signup.error {
        lines.push(Line::from(format!("  ! {}", err)));
    }
    lines.push(Line::from(""));

    match app.signup.state {
        SignupState::Submitting => lines.push(Line::from("creating account...")),
        SignupState::Complete => {
            lines.push(Line::from("* account created"));
            lines.push(Line::from("returning to login..."));
        }
        SignupState::Editing => {
            if app.signup.can_submit() {
                lines.push(Line::from(
                    "[enter] create  [tab] switch field  [esc] back to login",
                ));
            } else {
                lines.push(Line::from(
                    "passwords must be non-empty and match to continue",
                ));
                lines.push(Line::from("[tab] switch field  [esc] back to login"));
            }
        }
    }
}

fn browser_ui<'a>(lines: &mut Vec<Line<'a>>, app: &'a App) {
    let crumbs = app.browser.breadcrumbs();
    let crumb_text: Vec<String> = crumbs
        .iter()
        .enumerate()
        .map(|(i, c)| format!("{}:{}", i, c.label))
        .collect();
    lines.push(Line::from(format!("path: {}", crumb_text.join("  "))));
    lines.push(Line::from(""));

    match &app.browser.overlay {
        Overlay::None => {
            entry_table(lines, app);
            lines.push(Line::from(""));
            if app.browser.loading {
                lines.push(Line::from("loading..."));
            } else {
                lines.push(Line::from(
                    "[enter] open  [d] delete  [backspace] up  [0-9] jump  [r] refresh  [q] quit",
                ));
            }
        }
        Overlay::Detail(detail) => {
            lines.push(Line::from(Span::styled(
                "file detail",
                Style::default().add_modifier(Modifier::BOLD),
            )));
            lines.push(Line::from(""));
            lines.push(Line::from(format!("  filename: {}", detail.name)));
            if let Some(description) = &detail.description {
                lines.push(Line::from(format!("  description: {}", description)));
            }
            if let Some(file_type) = &detail.file_type {
                lines.push(Line::from(format!("  type: {}", file_type)));
            }
            lines.push(Line::from(format!(
                "  size: {}",
                format::format_entry_size(EntryKind::File, detail.size)
            )));
            if let Some(md5) = &detail.md5 {
                lines.push(Line::from(format!("  md5: {}", md5)));
            }
            let uploaded = format::time_ago(&detail.upload_date, chrono::Utc::now());
            lines.push(Line::from(format!(
                "  uploaded: {}",
                uploaded.unwrap_or_default()
            )));
            if !detail.tags.is_empty() {
                lines.push(Line::from(format!("  tags: {}", detail.tags.join(", "))));
            }
            lines.push(Line::from(""));
            lines.push(Line::from("[d] delete  [esc] close"));
        }
        Overlay::ConfirmDelete(target) => {
            match target {
                DeleteTarget::File { name, .. } => {
                    lines.push(Line::from(format!("delete the file '{}'?", name)));
                }
                DeleteTarget::Folder { path } => {
                    lines.push(Line::from(format!("delete the folder '{}'?", path)));
                }
            }
            lines.push(Line::from(""));
            lines.push(Line::from("[y] delete  [n] cancel"));
        }
        Overlay::Error(message) => {
            lines.push(Line::from("! request failed"));
            lines.push(Line::from(""));
            lines.push(Line::from(message.as_str()));
            lines.push(Line::from(""));
            lines.push(Line::from("[esc] dismiss"));
        }
    }
}

fn entry_table(lines: &mut Vec<Line>, app: &App) {
    if app.browser.entries.is_empty() && !app.browser.loading {
        lines.push(Line::from("empty folder"));
        return;
    }

    let now = chrono::Utc::now();
    for (i, entry) in app.browser.entries.iter().enumerate() {
        let name = match entry.kind {
            EntryKind::Folder => format!("{}/", entry.name.trim_matches('/')),
            EntryKind::File => entry.name.clone(),
        };
        let size = format::format_entry_size(entry.kind, entry.size);
        let age = format::time_ago(&entry.upload_date, now).unwrap_or_default();
        let row = format!("  {:<40} {:>10}  {}", name, size, age);

        if i == app.browser.selected {
            lines.push(Line::from(Span::styled(
                row,
                Style::default().add_modifier(Modifier::REVERSED),
            )));
        } else {
            lines.push(Line::from(row));
        }
    }
}
