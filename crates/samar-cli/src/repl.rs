//! Line commands and text rendering.
//!
//! Lines starting with `/` are commands; anything else is sent to the
//! selected conversation.

use std::path::Path;

use anyhow::Context as _;
use chrono::Local;
use samar_core::{
  identity::FederatedCredential,
  profile::StatusPreset,
  store::{BlobStore, ChatStore, IdentityProvider},
};
use samar_session::{
  Client, ClientEvent, Direction, Error, SessionEvent,
  avatar::AvatarUpload,
  contacts::Contact,
  directory::DirectoryEntry,
};

pub const HELP: &str = "\
commands:
  /signup <email> <password> <name...>   create an account
  /signin <email> <password>             sign in
  /federated <provider> <subject> <email> <name...>
                                         sign in with a verified assertion
  /signout                               sign out
  /contacts [filter]                     list conversations
  /users [filter]                        list everyone else
  /open <n>                              select contact n from /contacts
  /chat <n>                              start chatting with user n from /users
  /status <text...>                      set free-form status
  /quick <available|busy|unavailable|sleeping>
  /avatar <file>                         set profile picture
  /me                                    show own profile
  /help                                  this text
  /quit
anything else is sent to the open conversation";

// ─── Commands ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
  SignUp { email: String, password: String, name: String },
  SignIn { email: String, password: String },
  Federated { provider: String, subject: String, email: String, name: String },
  SignOut,
  Contacts(String),
  Users(String),
  Open(usize),
  Chat(usize),
  Status(String),
  Quick(StatusPreset),
  Avatar(String),
  Me,
  Help,
  Quit,
  Send(String),
}

impl Command {
  pub fn parse(line: &str) -> Result<Self, String> {
    let Some(rest) = line.trim().strip_prefix('/') else {
      return Ok(Self::Send(line.to_owned()));
    };
    let (name, args) = rest.split_once(' ').unwrap_or((rest, ""));
    let args = args.trim();
    let words: Vec<&str> = args.split_whitespace().collect();

    let rest_from = |n: usize| words.get(n..).map(|w| w.join(" ")).unwrap_or_default();
    let index = || {
      args
        .parse::<usize>()
        .ok()
        .filter(|n| *n > 0)
        .ok_or_else(|| format!("/{name} needs a number from the list"))
    };

    match (name, words.as_slice()) {
      ("signup", [email, password, _, ..]) => Ok(Self::SignUp {
        email:    (*email).to_owned(),
        password: (*password).to_owned(),
        name:     rest_from(2),
      }),
      ("signin", [email, password]) => Ok(Self::SignIn {
        email:    (*email).to_owned(),
        password: (*password).to_owned(),
      }),
      ("federated", [provider, subject, email, _, ..]) => Ok(Self::Federated {
        provider: (*provider).to_owned(),
        subject:  (*subject).to_owned(),
        email:    (*email).to_owned(),
        name:     rest_from(3),
      }),
      ("signout", []) => Ok(Self::SignOut),
      ("contacts", _) => Ok(Self::Contacts(args.to_owned())),
      ("users", _) => Ok(Self::Users(args.to_owned())),
      ("open", _) => index().map(Self::Open),
      ("chat", _) => index().map(Self::Chat),
      ("status", _) => Ok(Self::Status(args.to_owned())),
      ("quick", [preset]) => preset
        .parse()
        .map(Self::Quick)
        .map_err(|_| format!("unknown preset {preset:?}")),
      ("avatar", [_, ..]) => Ok(Self::Avatar(args.to_owned())),
      ("me", []) => Ok(Self::Me),
      ("help", _) => Ok(Self::Help),
      ("quit" | "exit", _) => Ok(Self::Quit),
      _ => Err(format!("cannot parse /{name}; try /help")),
    }
  }
}

/// MIME type from a file extension. Unknown extensions map to a type the
/// avatar policy rejects.
pub fn guess_media_type(path: &Path) -> &'static str {
  let ext = path
    .extension()
    .and_then(|e| e.to_str())
    .map(str::to_ascii_lowercase);
  match ext.as_deref() {
    Some("jpg" | "jpeg") => "image/jpeg",
    Some("png") => "image/png",
    Some("gif") => "image/gif",
    Some("webp") => "image/webp",
    _ => "application/octet-stream",
  }
}

// ─── Repl ────────────────────────────────────────────────────────────────────

/// Keeps the last printed listings so `/open` and `/chat` can refer to them
/// by number.
#[derive(Default)]
pub struct Repl {
  listed_contacts: Vec<Contact>,
  listed_users:    Vec<DirectoryEntry>,
  shown_messages:  usize,
}

impl Repl {
  /// Run one input line. Returns `false` when the user asked to quit.
  pub async fn handle<S, B, I>(
    &mut self,
    client: &mut Client<S, B, I>,
    line: &str,
  ) -> anyhow::Result<bool>
  where
    S: ChatStore,
    B: BlobStore,
    I: IdentityProvider,
  {
    if line.trim().is_empty() {
      return Ok(true);
    }
    let command = match Command::parse(line) {
      Ok(command) => command,
      Err(message) => {
        println!("! {message}");
        return Ok(true);
      }
    };
    if command == Command::Quit {
      return Ok(false);
    }

    match self.run(client, command).await {
      Ok(()) => {}
      Err(Error::Store(e)) => println!("! store error: {e}"),
      Err(e) => println!("! {e}"),
    }
    Ok(true)
  }

  async fn run<S, B, I>(
    &mut self,
    client: &mut Client<S, B, I>,
    command: Command,
  ) -> samar_session::Result<()>
  where
    S: ChatStore,
    B: BlobStore,
    I: IdentityProvider,
  {
    match command {
      Command::SignUp { email, password, name } => {
        let me = client.sign_up_email(&email, &password, &name).await?;
        println!("signed up as {} <{}>", me.display_name, me.email);
      }
      Command::SignIn { email, password } => {
        let me = client.sign_in_email(&email, &password).await?;
        println!("signed in as {} <{}>", me.display_name, me.email);
      }
      Command::Federated { provider, subject, email, name } => {
        let me = client
          .sign_in_federated(FederatedCredential {
            provider,
            subject,
            email,
            display_name: name,
            avatar_url: String::new(),
          })
          .await?;
        println!("signed in as {} <{}>", me.display_name, me.email);
      }
      Command::SignOut => {
        client.sign_out().await?;
        self.listed_contacts.clear();
        self.listed_users.clear();
        self.shown_messages = 0;
        println!("signed out");
      }
      Command::Contacts(filter) => {
        let contacts = client.require_session()?.filtered_contacts(&filter);
        print_contacts(&contacts);
        self.listed_contacts = contacts;
      }
      Command::Users(filter) => {
        let users = client.require_session()?.filtered_directory(&filter);
        print_users(&users);
        self.listed_users = users;
      }
      Command::Open(n) => {
        let session = client.require_session()?;
        let Some(contact) = self.listed_contacts.get(n - 1).cloned() else {
          println!("! no contact {n}; run /contacts first");
          return Ok(());
        };
        session.select_contact(&contact).await?;
        self.shown_messages = 0;
        println!("── {} ──", contact.display_name);
        self.print_new_messages(&session.messages());
      }
      Command::Chat(n) => {
        let session = client.require_session()?;
        let Some(entry) = self.listed_users.get(n - 1).cloned() else {
          println!("! no user {n}; run /users first");
          return Ok(());
        };
        let contact = session.open_chat_with(&entry).await?;
        self.shown_messages = 0;
        println!("── {} ──", contact.display_name);
        self.print_new_messages(&session.messages());
      }
      Command::Status(text) => {
        if client.require_session()?.set_status(&text).await? {
          println!("status set");
        }
      }
      Command::Quick(preset) => {
        let session = client.require_session()?;
        session.set_quick_status(preset).await?;
        println!("status: {}", session.config().quick_status(preset));
      }
      Command::Avatar(path) => {
        let session = client.require_session()?;
        let path = Path::new(&path);
        let bytes = match tokio::fs::read(path)
          .await
          .with_context(|| format!("reading {}", path.display()))
        {
          Ok(bytes) => bytes,
          Err(e) => {
            println!("! {e:#}");
            return Ok(());
          }
        };
        let upload = AvatarUpload {
          file_name: path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "avatar".into()),
          media_type: guess_media_type(path).to_owned(),
          bytes,
        };
        let url = session.set_avatar(upload).await?;
        println!("avatar set ({} chars)", url.len());
      }
      Command::Me => {
        let session = client.require_session()?;
        match session.profile() {
          Some(p) => println!(
            "{} <{}>\n  status: {}\n  online: {}\n  last seen: {}",
            p.display_name,
            p.email,
            p.status,
            p.is_online,
            p.last_seen.format("%Y-%m-%d %H:%M")
          ),
          None => println!("no profile loaded"),
        }
      }
      Command::Help => println!("{HELP}"),
      Command::Send(text) => {
        let session = client.require_session()?;
        if session.selected().is_none() {
          println!("! open a conversation first (/contacts, /open <n>)");
          return Ok(());
        }
        session.send_message(&text).await?;
      }
      Command::Quit => {}
    }
    Ok(())
  }

  /// Print what a pushed change means to the user.
  pub fn render<S, B, I>(&mut self, client: &Client<S, B, I>, event: &ClientEvent)
  where
    S: ChatStore,
    B: BlobStore,
    I: IdentityProvider,
  {
    match event {
      ClientEvent::SignedIn(identity) => {
        println!("* signed in as {}", identity.display_name);
      }
      ClientEvent::SignedOut => {
        self.shown_messages = 0;
        println!("* signed out");
      }
      ClientEvent::Session(SessionEvent::Messages) => {
        if let Some(session) = client.session() {
          self.print_new_messages(&session.messages());
        }
      }
      ClientEvent::Session(SessionEvent::Contacts | SessionEvent::Directory) => {}
    }
  }

  fn print_new_messages(&mut self, messages: &[samar_session::ChatMessage]) {
    if messages.len() < self.shown_messages {
      self.shown_messages = 0;
    }
    for m in &messages[self.shown_messages..] {
      let arrow = match m.direction {
        Direction::Outgoing => ">",
        Direction::Incoming => "<",
      };
      println!(
        "{} {arrow} {}: {}",
        m.record.sent_at.with_timezone(&Local).format("%H:%M"),
        m.record.sender_name,
        m.record.text
      );
    }
    self.shown_messages = messages.len();
  }
}

fn print_contacts(contacts: &[Contact]) {
  if contacts.is_empty() {
    println!("(no conversations)");
  }
  for (i, c) in contacts.iter().enumerate() {
    let marker = if c.is_selected { "*" } else { " " };
    let online = if c.is_online { "●" } else { "○" };
    let when = c
      .last_message_time
      .map(|t| t.format("%m-%d %H:%M").to_string())
      .unwrap_or_default();
    println!(
      "{marker}{:>3}. {online} {:<24} {:<11} {}",
      i + 1,
      c.display_name,
      when,
      c.status_preview
    );
  }
}

fn print_users(users: &[DirectoryEntry]) {
  if users.is_empty() {
    println!("(nobody found)");
  }
  for (i, u) in users.iter().enumerate() {
    let online = if u.is_online { "●" } else { "○" };
    println!("{:>4}. {online} {:<24} {:<28} {}", i + 1, u.display_name, u.email, u.status);
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn plain_lines_are_messages() {
    assert_eq!(Command::parse("hello there"), Ok(Command::Send("hello there".into())));
  }

  #[test]
  fn commands_take_their_arguments() {
    assert_eq!(
      Command::parse("/signup a@x.io secret1 Mona Z"),
      Ok(Command::SignUp {
        email:    "a@x.io".into(),
        password: "secret1".into(),
        name:     "Mona Z".into(),
      })
    );
    assert_eq!(Command::parse("/open 2"), Ok(Command::Open(2)));
    assert_eq!(Command::parse("/quick busy"), Ok(Command::Quick(StatusPreset::Busy)));
    assert_eq!(Command::parse("/users  stone "), Ok(Command::Users("stone".into())));
    assert_eq!(Command::parse("/contacts"), Ok(Command::Contacts(String::new())));
  }

  #[test]
  fn malformed_commands_are_rejected() {
    assert!(Command::parse("/open zero").is_err());
    assert!(Command::parse("/open 0").is_err());
    assert!(Command::parse("/signin only-email").is_err());
    assert!(Command::parse("/quick napping").is_err());
    assert!(Command::parse("/frobnicate").is_err());
  }

  #[test]
  fn media_type_follows_extension() {
    assert_eq!(guess_media_type(Path::new("me.JPG")), "image/jpeg");
    assert_eq!(guess_media_type(Path::new("me.webp")), "image/webp");
    assert_eq!(guess_media_type(Path::new("me.svg")), "application/octet-stream");
    assert_eq!(guess_media_type(Path::new("me")), "application/octet-stream");
  }
}
