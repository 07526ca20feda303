//! Minimal server-rendered pages. The real front-end polls the JSON API; these
//! exist so the sites boot to something usable and the account flow works
//! without a client bundle.

use axum::response::Html;
use chrono::{DateTime, Utc};
use yuletide_core::account::Account;

use crate::App;

fn escape(s: &str) -> String {
  let mut out = String::with_capacity(s.len());
  for c in s.chars() {
    match c {
      '&' => out.push_str("&amp;"),
      '<' => out.push_str("&lt;"),
      '>' => out.push_str("&gt;"),
      '"' => out.push_str("&quot;"),
      '\'' => out.push_str("&#x27;"),
      _ => out.push(c),
    }
  }
  out
}

fn layout(title: &str, body: &str) -> Html<String> {
  Html(format!(
    "<!doctype html>\n<html lang=\"ko\">\n<head>\n<meta charset=\"utf-8\">\n\
     <title>{title}</title>\n</head>\n<body>\n{body}\n</body>\n</html>\n",
    title = escape(title),
  ))
}

fn account_links(app: App, viewer: Option<&Account>) -> String {
  match viewer {
    Some(a) => format!(
      "<p>Signed in as <strong>{}</strong>.</p>\n\
       <form method=\"post\" action=\"{}\"><button>Log out</button></form>",
      escape(&a.username),
      app.logout_path(),
    ),
    None => format!(
      "<p><a href=\"{}\">Log in</a> · <a href=\"{}\">Sign up</a></p>",
      app.login_path(),
      app.signup_path(),
    ),
  }
}

pub fn wall_home(now: DateTime<Utc>, has_posted: bool, viewer: Option<&Account>) -> Html<String> {
  let body = format!(
    "<h1>Snowball Wall</h1>\n\
     <main id=\"wall\" data-server-time=\"{now}\" data-has-posted=\"{has_posted}\"></main>\n{links}",
    now = now.to_rfc3339(),
    links = account_links(App::Wall, viewer),
  );
  layout("Snowball Wall", &body)
}

pub fn bell_home(now: DateTime<Utc>, viewer: Option<&Account>) -> Html<String> {
  let body = format!(
    "<h1>New Year Bell</h1>\n\
     <main id=\"bell\" data-server-time=\"{now}\"></main>\n{links}",
    now = now.to_rfc3339(),
    links = account_links(App::Bell, viewer),
  );
  layout("New Year Bell", &body)
}

fn error_line(error: Option<&str>) -> String {
  error
    .map(|e| format!("<p class=\"error\">{}</p>\n", escape(e)))
    .unwrap_or_default()
}

pub fn signup_form(app: App, error: Option<&str>) -> Html<String> {
  let body = format!(
    "<h1>Sign up</h1>\n{error}\
     <form method=\"post\" action=\"{action}\">\n\
     <label>Username <input name=\"username\" required></label>\n\
     <label>Email <input name=\"email\" type=\"email\" required></label>\n\
     <label>Password <input name=\"password\" type=\"password\" required></label>\n\
     <button>Create account</button>\n</form>\n\
     <p><a href=\"{login}\">Already have an account?</a></p>",
    error = error_line(error),
    action = app.signup_path(),
    login = app.login_path(),
  );
  layout("Sign up", &body)
}

pub fn login_form(app: App, error: Option<&str>) -> Html<String> {
  let body = format!(
    "<h1>Log in</h1>\n{error}\
     <form method=\"post\" action=\"{action}\">\n\
     <label>Username <input name=\"username\" required></label>\n\
     <label>Password <input name=\"password\" type=\"password\" required></label>\n\
     <button>Log in</button>\n</form>\n\
     <p><a href=\"{signup}\">Create an account</a></p>",
    error = error_line(error),
    action = app.login_path(),
    signup = app.signup_path(),
  );
  layout("Log in", &body)
}
