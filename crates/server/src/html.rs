//! Hand-rendered HTML pages (no templating layer for a five-page UI).

use croco_store::{UserSummary, WordRow};

use crate::upload::UploadReport;

pub const DEFAULT_WORD_COUNT: i64 = 120;
pub const MAX_WORD_COUNT: i64 = 10_000;
pub const MAX_WORDS_PAGE_SIZE: i64 = 1000;

/// Minimal escaping for user-supplied values interpolated into markup.
pub fn escape(value: &str) -> String {
    value
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

fn message_block(message: Option<&str>) -> String {
    match message {
        Some(msg) => format!("<p style=\"color:#b00\">{}</p>", escape(msg)),
        None => String::new(),
    }
}

pub fn render_index(username: &str, is_admin: bool, total_words: i64) -> String {
    let admin_link = if is_admin {
        "<p><a href=\"/admin\">Open admin panel</a></p>"
    } else {
        ""
    };
    format!(
        r#"<!doctype html>
<html lang="en">
<head>
  <meta charset="utf-8" />
  <meta name="viewport" content="width=device-width, initial-scale=1" />
  <title>Blitz Croco Words</title>
  <style>
    body {{ font-family: Arial, sans-serif; max-width: 720px; margin: 40px auto; }}
    form {{ margin: 24px 0; padding: 16px; border: 1px solid #ddd; }}
    label {{ display: block; margin-bottom: 8px; }}
    input[type="number"] {{ width: 120px; }}
  </style>
</head>
<body>
  <h1>Blitz Croco Words</h1>
  <p>Signed in as: {username}</p>
  <p>Words in database: {total_words}</p>
  <p><a href="/logout">Sign out</a></p>
  <p><a href="/words">Word list</a></p>
  {admin_link}

  <h2>Upload pptx or zip</h2>
  <form action="/upload" method="post" enctype="multipart/form-data">
    <label>Files: <input type="file" name="files" accept=".pptx,.zip" multiple required></label>
    <button type="submit">Upload</button>
  </form>

  <h2>Download words</h2>
  <form action="/words.txt" method="get">
    <label>Word count:
      <input type="number" name="n" min="1" max="{MAX_WORD_COUNT}"
             value="{DEFAULT_WORD_COUNT}" required>
    </label>
    <label>
      <input type="checkbox" name="shuffle"> Shuffle words
    </label>
    <button type="submit">Download words.txt</button>
  </form>

  <h2>Reset word usage</h2>
  <form action="/usage/reset" method="post">
    <button type="submit">Reset for me</button>
  </form>
</body>
</html>
"#,
        username = escape(username),
    )
}

pub fn render_login(username: &str, error: Option<&str>) -> String {
    format!(
        r#"<!doctype html>
<html lang="en">
<head>
  <meta charset="utf-8" />
  <meta name="viewport" content="width=device-width, initial-scale=1" />
  <title>Sign in</title>
  <style>
    body {{ font-family: Arial, sans-serif; max-width: 420px; margin: 40px auto; }}
    form {{ margin: 16px 0; padding: 16px; border: 1px solid #ddd; }}
    label {{ display: block; margin-bottom: 8px; }}
  </style>
</head>
<body>
  <h1>Sign in</h1>
  {error_block}
  <form action="/login" method="post">
    <label>Username:
      <input name="username" value="{username}" autocomplete="username" required>
    </label>
    <label>Password:
      <input type="password" name="password" autocomplete="current-password" required>
    </label>
    <button type="submit">Sign in</button>
  </form>
</body>
</html>
"#,
        error_block = message_block(error),
        username = escape(username),
    )
}

pub fn render_upload_result(username: &str, report: &UploadReport) -> String {
    format!(
        r#"<!doctype html>
<html lang="en">
<head>
  <meta charset="utf-8" />
  <meta name="viewport" content="width=device-width, initial-scale=1" />
  <title>Upload result</title>
  <style>
    body {{ font-family: Arial, sans-serif; max-width: 720px; margin: 40px auto; }}
    a {{ display: inline-block; margin-top: 16px; }}
  </style>
</head>
<body>
  <h1>Upload result</h1>
  <p>Signed in as: {username}</p>
  <ul>
    <li>Files: {filenames}</li>
    <li>Extracted: {extracted}</li>
    <li>Unique extracted: {unique_extracted}</li>
    <li>Checked unique: {checked_unique}</li>
    <li>Inserted: {inserted}</li>
  </ul>
  <a href="/">Back</a>
</body>
</html>
"#,
        username = escape(username),
        filenames = escape(&report.filenames),
        extracted = report.extracted,
        unique_extracted = report.unique_extracted,
        checked_unique = report.checked_unique,
        inserted = report.inserted,
    )
}

pub fn render_admin(username: &str, users: &[UserSummary], message: Option<&str>) -> String {
    let mut rows = String::new();
    for user in users {
        let admin_label = if user.is_admin { "yes" } else { "no" };
        rows.push_str(&format!(
            "<tr><td>{}</td><td>{}</td><td>{}</td></tr>",
            escape(&user.username),
            admin_label,
            escape(&user.created_at),
        ));
    }
    let options: String = users
        .iter()
        .map(|u| format!("<option value=\"{}\"></option>", escape(&u.username)))
        .collect();

    format!(
        r#"<!doctype html>
<html lang="en">
<head>
  <meta charset="utf-8" />
  <meta name="viewport" content="width=device-width, initial-scale=1" />
  <title>Admin panel</title>
  <style>
    body {{ font-family: Arial, sans-serif; max-width: 860px; margin: 40px auto; }}
    table {{ border-collapse: collapse; width: 100%; margin: 16px 0; }}
    th, td {{ border: 1px solid #ddd; padding: 8px; text-align: left; }}
    form {{ margin: 16px 0; padding: 12px; border: 1px solid #ddd; }}
    label {{ display: block; margin-bottom: 8px; }}
  </style>
</head>
<body>
  <h1>Admin panel</h1>
  <p>Signed in as: {username}</p>
  <p><a href="/">Back</a> · <a href="/words">Word list</a> · <a href="/logout">Sign out</a></p>
  {message_block}

  <h2>Users</h2>
  <table>
    <thead>
      <tr><th>Username</th><th>Admin</th><th>Created</th></tr>
    </thead>
    <tbody>
      {rows}
    </tbody>
  </table>

  <datalist id="usernames">
    {options}
  </datalist>

  <h2>Create user</h2>
  <form action="/admin/users/create" method="post">
    <label>Username: <input name="username" list="usernames" required></label>
    <label>Password: <input type="password" name="password" required></label>
    <label><input type="checkbox" name="is_admin"> Admin</label>
    <button type="submit">Create</button>
  </form>

  <h2>Change password</h2>
  <form action="/admin/users/password" method="post">
    <label>Username: <input name="username" list="usernames" required></label>
    <label>New password: <input type="password" name="password" required></label>
    <button type="submit">Change password</button>
  </form>

  <h2>Change role</h2>
  <form action="/admin/users/role" method="post">
    <label>Username: <input name="username" list="usernames" required></label>
    <label><input type="checkbox" name="is_admin"> Admin</label>
    <button type="submit">Change role</button>
  </form>

  <h2>Delete user</h2>
  <form action="/admin/users/delete" method="post">
    <label>Username: <input name="username" list="usernames" required></label>
    <button type="submit">Delete</button>
  </form>

  <h2>Reset usage</h2>
  <form action="/admin/users/reset-usage" method="post">
    <label>Username: <input name="username" list="usernames" required></label>
    <button type="submit">Reset</button>
  </form>
</body>
</html>
"#,
        username = escape(username),
        message_block = message_block(message),
    )
}

/// Context for the paginated word listing.
pub struct WordsPage<'a> {
    pub username: &'a str,
    pub words: &'a [WordRow],
    pub total: i64,
    pub page: i64,
    pub per_page: i64,
    pub order: &'a str,
    pub message: Option<&'a str>,
}

/// Number of pages for a listing, never less than one.
pub fn total_pages(total: i64, per_page: i64) -> i64 {
    ((total + per_page - 1) / per_page).max(1)
}

fn nav_links(page: i64, pages: i64, per_page: i64, order: &str) -> (String, String) {
    let prev = if page > 1 {
        format!(
            "<a href=\"/words?page={}&per_page={}&order={}\">Prev</a>",
            page - 1,
            per_page,
            order
        )
    } else {
        "<span>Prev</span>".to_string()
    };
    let next = if page < pages {
        format!(
            "<a href=\"/words?page={}&per_page={}&order={}\">Next</a>",
            page + 1,
            per_page,
            order
        )
    } else {
        "<span>Next</span>".to_string()
    };
    (prev, next)
}

pub fn render_words_page(ctx: &WordsPage<'_>) -> String {
    let mut rows = String::new();
    for row in ctx.words {
        rows.push_str(&format!(
            concat!(
                "<tr><td>{word}</td><td>{last_used}</td><td>",
                "<form method=\"post\" action=\"/words/edit\">",
                "<input type=\"hidden\" name=\"word_id\" value=\"{id}\">",
                "<input name=\"word\" value=\"{word}\" required>",
                "<button type=\"submit\">Save</button>",
                "</form></td></tr>"
            ),
            id = row.id,
            word = escape(&row.word),
            last_used = escape(&row.last_used),
        ));
    }

    let pages = total_pages(ctx.total, ctx.per_page);
    let (prev_link, next_link) = nav_links(ctx.page, pages, ctx.per_page, ctx.order);
    let order_alpha_selected = if ctx.order == "alpha" { "selected" } else { "" };
    let order_created_selected = if ctx.order == "created_desc" {
        "selected"
    } else {
        ""
    };

    format!(
        r#"<!doctype html>
<html lang="en">
<head>
  <meta charset="utf-8" />
  <meta name="viewport" content="width=device-width, initial-scale=1" />
  <title>Words</title>
  <style>
    body {{ font-family: Arial, sans-serif; max-width: 860px; margin: 40px auto; }}
    table {{ border-collapse: collapse; width: 100%; margin: 16px 0; }}
    th, td {{ border: 1px solid #ddd; padding: 8px; text-align: left; }}
    form {{ margin: 12px 0; }}
    nav {{ display: flex; gap: 12px; align-items: center; margin: 12px 0; }}
    nav span {{ color: #666; }}
  </style>
</head>
<body>
  <h1>Words</h1>
  <p>Signed in as: {username}</p>
  <p>Words in database: {total}</p>
  <p><a href="/">Back</a> · <a href="/logout">Sign out</a></p>
  {message_block}

  <form method="get" action="/words">
    <label>Order:
      <select name="order">
        <option value="alpha" {order_alpha_selected}>Alphabetical</option>
        <option value="created_desc" {order_created_selected}>Newest first</option>
      </select>
    </label>
    <label>Per page:
      <input type="number" name="per_page" min="1" max="{MAX_WORDS_PAGE_SIZE}"
             value="{per_page}" required>
    </label>
    <input type="hidden" name="page" value="1">
    <button type="submit">Apply</button>
  </form>

  <nav>
    {prev_link}
    <span>Page {page} / {pages} · Total {total}</span>
    {next_link}
  </nav>

  <table>
    <thead>
      <tr><th>Word</th><th>Last used</th><th>Edit</th></tr>
    </thead>
    <tbody>
      {rows}
    </tbody>
  </table>

  <nav>
    {prev_link}
    <span>Page {page} / {pages}</span>
    {next_link}
  </nav>
</body>
</html>
"#,
        username = escape(ctx.username),
        total = ctx.total,
        message_block = message_block(ctx.message),
        per_page = ctx.per_page,
        page = ctx.page,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape() {
        assert_eq!(escape("a&b<c>\"d\""), "a&amp;b&lt;c&gt;&quot;d&quot;");
        assert_eq!(escape("plain"), "plain");
    }

    #[test]
    fn test_total_pages() {
        assert_eq!(total_pages(0, 200), 1);
        assert_eq!(total_pages(1, 200), 1);
        assert_eq!(total_pages(200, 200), 1);
        assert_eq!(total_pages(201, 200), 2);
        assert_eq!(total_pages(1000, 200), 5);
    }

    #[test]
    fn test_nav_links_disable_at_bounds() {
        let (prev, next) = nav_links(1, 3, 200, "alpha");
        assert!(prev.starts_with("<span>"));
        assert!(next.contains("/words?page=2"));

        let (prev, next) = nav_links(3, 3, 200, "alpha");
        assert!(prev.contains("/words?page=2"));
        assert!(next.starts_with("<span>"));
    }
}
