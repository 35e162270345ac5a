//! Test doubles and HTML fixtures shared by the unit tests.

use crate::client::{Fetch, Request, Response};
use crate::error::FetchError;
use crate::models::{AnnouncementDetail, NewAnnouncement};
use chrono::NaiveDate;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::time::Instant;

/// What the fake answers for one call.
#[derive(Debug, Clone)]
pub enum Outcome {
    Body(String),
    Status(u16),
    Transport,
    InvalidUrl,
}

#[derive(Default)]
struct FakeState {
    /// Queued outcomes per URL; the last one repeats forever.
    routes: HashMap<String, Vec<Outcome>>,
    requests: Vec<Request>,
    times: Vec<Instant>,
}

/// Scripted in-process transport. Unknown URLs answer 404.
#[derive(Clone, Default)]
pub struct FakeTransport {
    state: Arc<Mutex<FakeState>>,
}

impl FakeTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Serve `body` for every request to `url`.
    pub fn page(&self, url: &str, body: impl Into<String>) {
        self.script(url, vec![Outcome::Body(body.into())]);
    }

    pub fn script(&self, url: &str, outcomes: Vec<Outcome>) {
        self.state
            .lock()
            .unwrap()
            .routes
            .insert(url.to_string(), outcomes);
    }

    pub fn calls(&self) -> Vec<String> {
        self.requests().into_iter().map(|r| r.url).collect()
    }

    pub fn requests(&self) -> Vec<Request> {
        self.state.lock().unwrap().requests.clone()
    }

    pub fn call_times(&self) -> Vec<Instant> {
        self.state.lock().unwrap().times.clone()
    }
}

impl Fetch for FakeTransport {
    async fn execute(&self, request: Request) -> Result<Response, FetchError> {
        let outcome = {
            let mut state = self.state.lock().unwrap();
            state.requests.push(request.clone());
            state.times.push(Instant::now());
            match state.routes.get_mut(&request.url) {
                Some(queue) if queue.len() > 1 => queue.remove(0),
                Some(queue) => queue[0].clone(),
                None => Outcome::Status(404),
            }
        };

        match outcome {
            Outcome::Body(body) => Ok(Response {
                url: request.url,
                status: 200,
                body,
            }),
            Outcome::Status(status) => Err(FetchError::Status {
                url: request.url,
                status,
            }),
            Outcome::Transport => Err(FetchError::Transport {
                url: request.url,
                source: Box::new(std::io::Error::other("connection reset")),
            }),
            Outcome::InvalidUrl => Err(FetchError::InvalidUrl {
                source: url::Url::parse("").unwrap_err(),
                url: request.url,
            }),
        }
    }
}

/// One row of a generated listing page.
#[derive(Debug, Clone)]
pub struct Row {
    pub seq: String,
    /// `YYYY-MM-DD`
    pub date: String,
    pub views: u64,
    pub notice: bool,
}

impl Row {
    pub fn new(seq: impl Into<String>, date: &str, views: u64) -> Self {
        Row {
            seq: seq.into(),
            date: date.to_string(),
            views,
            notice: false,
        }
    }

    pub fn notice(seq: impl Into<String>, date: &str) -> Self {
        Row {
            notice: true,
            ..Row::new(seq, date, 0)
        }
    }
}

/// Listing markup in the common board layout.
pub fn common_listing(rows: &[Row]) -> String {
    let items: String = rows
        .iter()
        .map(|row| {
            let num = if row.notice { "공지".to_string() } else { row.seq.clone() };
            format!(
                r#"<li>
  <p class="num">{num}</p>
  <div class="ti"><a href="javascript:fnView('11', '{seq}');">Posting {seq}</a></div>
  <div class="da"><span>Office</span> <span>{date}</span> <span>{views}</span></div>
</li>"#,
                num = num,
                seq = row.seq,
                date = row.date.replace('-', "."),
                views = row.views,
            )
        })
        .collect();
    format!(
        r#"<html><body><div class="content-area"><div id="contents"><ul class="brd-lstp1">{}</ul></div></div></body></html>"#,
        items
    )
}

/// Detail markup in the common board layout.
pub fn common_detail(title: &str, author: &str, body: &str, tags: &[&str]) -> String {
    let tag_box = if tags.is_empty() {
        String::new()
    } else {
        let links: String = tags
            .iter()
            .map(|t| format!(r##"<a href="#">{}</a>"##, t))
            .collect();
        format!(r#"<div class="hashTag-bx">{}</div>"#, links)
    };
    format!(
        r#"<html><body><div id="contents"><div><div class="view-bx">
<div class="vw-tibx"><h4> {title} </h4><div><div><span>Writer</span><span> {author} </span></div></div></div>
<div class="vw-con">{body}</div>{tag_box}
</div></div></div></body></html>"#,
        title = title,
        author = author,
        body = body,
        tag_box = tag_box,
    )
}

/// Listing markup in the scholarship board layout; `date` is `YYYYMMDD`.
pub fn scholar_listing(rows: &[Row]) -> String {
    let items: String = rows
        .iter()
        .map(|row| {
            let num = if row.notice { "공지".to_string() } else { row.seq.clone() };
            let token = row.date.replace('-', "");
            format!(
                r#"<tr><td>{num}</td><td class="left"><a href="javascript:fnView('{token}', '{seq}');">Grant {seq}</a></td><td>Office</td><td>{date}</td><td>{views}</td></tr>"#,
                num = num,
                token = token,
                seq = row.seq,
                date = row.date,
                views = row.views,
            )
        })
        .collect();
    format!(
        r#"<html><body><div id="subConWarp"><form><table><thead><tr><th>No</th></tr></thead><tbody>{}</tbody></table></form></div></body></html>"#,
        items
    )
}

/// Detail markup in the scholarship board layout.
pub fn scholar_detail(title: &str, author: &str, body: &str) -> String {
    format!(
        r#"<html><body><div id="subConWarp"><table>
<thead><tr><td class="left_L fontBold">{title}</td></tr></thead>
<tbody><tr><td>Writer</td><td>{author}</td></tr><tr><td id="td_content">{body}</td></tr></tbody>
</table></div></body></html>"#,
        title = title,
        author = author,
        body = body,
    )
}

/// A staged record with placeholder content for `key`.
pub fn new_announcement(key: &str) -> NewAnnouncement {
    NewAnnouncement {
        scraping_key: key.to_string(),
        title: format!("title {}", key),
        author: "office".to_string(),
        board: "general".to_string(),
        written_at: NaiveDate::from_ymd_opt(2025, 3, 4).unwrap(),
        view_count: 1,
        target_url: "https://example.com/list.do".to_string(),
        major: None,
        tags: None,
        detail: AnnouncementDetail {
            url: format!("https://example.com/view.do?seq={}", key),
            html: "<p>x</p>".to_string(),
        },
    }
}
