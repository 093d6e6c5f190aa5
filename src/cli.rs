use crate::{
    api::{Backend, HttpBackend},
    auth::AuthPhase,
    catalog,
    config::Config,
    model::{format_money, AuthMode, AVATARS},
    storage::KvStore,
    storefront::Storefront,
};
use anyhow::Result;
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;
use std::cell::RefCell;

pub type App = Storefront<HttpBackend, Box<dyn KvStore>>;

pub struct Context {
    pub config: Config,
    pub storefront: RefCell<App>,
}

/// A parsed REPL line
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Exit,
    Help,
    Login {
        email: String,
        password: String,
    },
    Register {
        email: String,
        password: String,
        username: String,
        avatar: usize,
    },
    Avatars,
    WhoAmI,
    Balance,
    Deposit {
        amount: Option<String>,
    },
    /// Deposit the n-th configured quick amount (0-based)
    Quick {
        index: usize,
    },
    Logout,
    Catalog {
        filter: Option<String>,
    },
    Support,
    Session,
    Trace,
}

/// Parse a `/command arg...` line. Arguments use shell quoting.
pub fn parse_command(line: &str) -> Result<Command, String> {
    let words = shell_words::split(line).map_err(|e| format!("Invalid input: {}", e))?;
    let Some((name, args)) = words.split_first() else {
        return Err("Empty command".to_string());
    };

    let usage = |text: &str| -> Result<Command, String> { Err(format!("Usage: {}", text)) };

    match name.as_str() {
        "/exit" | "/quit" => Ok(Command::Exit),
        "/help" => Ok(Command::Help),
        "/login" => match args {
            [email, password] => Ok(Command::Login {
                email: email.clone(),
                password: password.clone(),
            }),
            _ => usage("/login <email> <password>"),
        },
        "/register" => {
            if args.len() < 2 || args.len() > 4 {
                return usage("/register <email> <password> [username] [avatar 1-3]");
            }
            let avatar = match args.get(3) {
                None => 0,
                Some(raw) => match raw.parse::<usize>() {
                    Ok(n) if (1..=AVATARS.len()).contains(&n) => n - 1,
                    _ => return Err(format!("Avatar must be 1-{}", AVATARS.len())),
                },
            };
            Ok(Command::Register {
                email: args[0].clone(),
                password: args[1].clone(),
                username: args.get(2).cloned().unwrap_or_default(),
                avatar,
            })
        }
        "/avatars" => Ok(Command::Avatars),
        "/whoami" => Ok(Command::WhoAmI),
        "/balance" => Ok(Command::Balance),
        "/deposit" => match args {
            [] => Ok(Command::Deposit { amount: None }),
            [amount] => Ok(Command::Deposit {
                amount: Some(amount.clone()),
            }),
            _ => usage("/deposit [amount]"),
        },
        "/quick" => match args {
            [n] => match n.parse::<usize>() {
                Ok(n) if n >= 1 => Ok(Command::Quick { index: n - 1 }),
                _ => usage("/quick <n>"),
            },
            _ => usage("/quick <n>"),
        },
        "/logout" => Ok(Command::Logout),
        "/catalog" => Ok(Command::Catalog {
            filter: args.first().cloned(),
        }),
        "/support" => Ok(Command::Support),
        "/session" => Ok(Command::Session),
        "/trace" => Ok(Command::Trace),
        other => Err(format!("Unknown command: {}", other)),
    }
}

pub fn run_once(ctx: &Context, line: &str) -> Result<()> {
    let mut front = ctx.storefront.borrow_mut();
    dispatch(&mut front, &ctx.config, line);
    Ok(())
}

pub fn run_repl(ctx: Context) -> Result<()> {
    let mut rl = DefaultEditor::new()?;

    println!("tickpay - type /help for commands, /exit to quit");
    println!("{}", ctx.storefront.borrow().header());

    loop {
        match rl.readline(">>> ") {
            Ok(line) => {
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }
                // keep credentials out of history
                if !line.starts_with("/login") && !line.starts_with("/register") {
                    rl.add_history_entry(line)?;
                }

                let mut front = ctx.storefront.borrow_mut();
                if dispatch(&mut front, &ctx.config, line) {
                    break;
                }
            }
            Err(ReadlineError::Interrupted | ReadlineError::Eof) => break,
            Err(e) => {
                eprintln!("Input error: {}", e);
                break;
            }
        }
    }

    Ok(())
}

/// Run one line against the storefront and print its notifications.
/// Returns true when the user asked to quit.
pub fn dispatch<B: Backend, S: KvStore>(
    front: &mut Storefront<B, S>,
    config: &Config,
    line: &str,
) -> bool {
    let command = match parse_command(line) {
        Ok(c) => c,
        Err(e) => {
            println!("{}", e);
            return false;
        }
    };

    let quit = execute(front, config, command);
    for notice in front.take_notices() {
        println!("{}", notice);
    }
    quit
}

fn execute<B: Backend, S: KvStore>(
    front: &mut Storefront<B, S>,
    config: &Config,
    command: Command,
) -> bool {
    match command {
        Command::Exit => return true,
        Command::Help => print_help(config),
        Command::Login { email, password } => {
            if let Some(user) = front.user() {
                println!("Уже вошли как {}. Сначала /logout", user.username);
                return false;
            }
            front.open_auth(AuthMode::Login);
            let form = front.auth_mut();
            form.email = email;
            form.password = password;
            front.submit_auth();
            report_auth(front);
        }
        Command::Register {
            email,
            password,
            username,
            avatar,
        } => {
            if let Some(user) = front.user() {
                println!("Уже вошли как {}. Сначала /logout", user.username);
                return false;
            }
            front.open_auth(AuthMode::Register);
            let form = front.auth_mut();
            form.email = email;
            form.password = password;
            form.username = username;
            form.select_avatar(avatar);
            front.submit_auth();
            report_auth(front);
        }
        Command::Avatars => {
            println!("Аватары:");
            for (i, url) in AVATARS.iter().enumerate() {
                println!("  {}: {}", i + 1, url);
            }
        }
        Command::WhoAmI => {
            println!("{}", front.header());
            if let Some(user) = front.user() {
                println!("  id: {}", user.id);
                println!("  email: {}", user.email);
            } else if let AuthPhase::Rejected(message) = front.auth().phase() {
                println!("  Последняя ошибка входа: {}", message);
            }
        }
        Command::Balance => match front.user() {
            Some(_) => println!("Баланс: {}", format_money(front.balance())),
            None => println!("Сначала войдите: /login <email> <password>"),
        },
        Command::Deposit { amount } => {
            let was_open = front.deposit_form().dialog_open;
            if !front.open_deposit() {
                println!("Сначала войдите: /login <email> <password>");
                return false;
            }
            match amount {
                Some(amount) => {
                    front.deposit_form_mut().amount_input = amount;
                    front.submit_deposit();
                    report_deposit(front);
                }
                // resubmit the amount kept after a failed attempt
                None if was_open && !front.deposit_form().amount_input.is_empty() => {
                    front.submit_deposit();
                    report_deposit(front);
                }
                None => {
                    println!("Пополнение баланса");
                    println!("  Текущий баланс: {}", format_money(front.balance()));
                    let presets: Vec<String> = config
                        .storefront
                        .quick_amounts()
                        .iter()
                        .map(|a| format_money(f64::from(*a)))
                        .collect();
                    println!("  Быстрые суммы: {}", presets.join("  "));
                    let kept = &front.deposit_form().amount_input;
                    if !kept.is_empty() {
                        println!("  Введённая сумма: {}", kept);
                    }
                    println!("  /deposit <сумма> или /quick <n> - пополнить");
                }
            }
        }
        Command::Quick { index } => {
            let presets = config.storefront.quick_amounts();
            let Some(&amount) = presets.get(index) else {
                println!("Быстрых сумм всего {}", presets.len());
                return false;
            };
            if !front.open_deposit() {
                println!("Сначала войдите: /login <email> <password>");
                return false;
            }
            front.deposit_form_mut().pick_preset(amount);
            front.submit_deposit();
            report_deposit(front);
        }
        Command::Logout => {
            if front.user().is_none() {
                println!("Вы не вошли в аккаунт");
                return false;
            }
            front.logout();
        }
        Command::Catalog { filter } => {
            let categories: Vec<&catalog::Category> = match &filter {
                Some(name) => match catalog::find(name) {
                    Some(category) => vec![category],
                    None => {
                        println!("Нет такого раздела: {}", name);
                        return false;
                    }
                },
                None => catalog::CATEGORIES.iter().collect(),
            };
            println!("Маркетплейс цифровых товаров и услуг");
            for category in categories {
                println!("  {} - {}", category.name, category.description);
                println!("    {}", category.items.join(" | "));
            }
        }
        Command::Support => {
            let handle = config.storefront.support_handle();
            println!(
                "Поддержка: @{} ({})",
                handle.trim_start_matches('@'),
                catalog::support_link(handle)
            );
        }
        Command::Session => {
            let log = front.log();
            println!("Run: {}", log.run_id());
            match log.path() {
                Some(path) => println!("Activity log: {}", path.display()),
                None => println!("Activity log: <memory>"),
            }
            println!("Auth endpoint: {}", config.endpoints.auth_url());
            println!("Balance endpoint: {}", config.endpoints.balance_url());
        }
        Command::Trace => {
            let log = front.log_mut();
            let on = !log.echo();
            log.set_echo(on);
            println!("Tracing: {}", if on { "on" } else { "off" });
        }
    }
    false
}

fn report_auth<B: Backend, S: KvStore>(front: &Storefront<B, S>) {
    if front.user().is_some() {
        println!("{}", front.header());
    } else if front.auth().open {
        println!("Форма входа сохранена; исправьте данные и повторите");
    }
}

fn report_deposit<B: Backend, S: KvStore>(front: &Storefront<B, S>) {
    if front.deposit_form().dialog_open {
        println!(
            "Сумма сохранена: {} (/deposit - отправить снова)",
            front.deposit_form().amount_input
        );
    } else {
        println!("Баланс: {}", format_money(front.balance()));
    }
}

fn print_help(config: &Config) {
    println!("Commands:");
    println!("  /exit                                   - quit");
    println!("  /help                                   - show commands");
    println!("  /catalog [name]                         - list storefront categories");
    println!("  /support                                - show support contact");
    println!("Account:");
    println!("  /login <email> <password>               - sign in");
    println!("  /register <email> <password> [name] [avatar]  - create an account (avatar 1-3)");
    println!("  /avatars                                - list avatar choices");
    println!("  /whoami                                 - show the signed-in account");
    println!("  /logout                                 - sign out on this machine");
    println!("Balance:");
    println!("  /balance                                - show cached balance");
    println!("  /deposit [amount]                       - top up");
    println!("  /quick <n>                              - top up by preset n of {:?}", config.storefront.quick_amounts());
    println!("Diagnostics:");
    println!("  /session                                - show run and endpoint info");
    println!("  /trace                                  - toggle event tracing");
}
