//! Plain-text rendering of search results.

use engine::SearchResult;
use tubescan_core::PaddedMatch;

/// Render one result as an indented block.
pub fn render(result: &SearchResult, color: bool) -> String {
  let mut out = String::new();
  let video = &result.video;

  let title = match &result.title_matches {
    Some(m) => highlight(m, color),
    None => video.title.clone(),
  };
  out.push_str(&format!("{}  {}\n", video.id, title));
  out.push_str(&format!("    uploaded {}\n", video.uploaded.format("%Y-%m-%d")));

  for m in &result.description_matches {
    out.push_str(&format!("    …{}…\n", highlight(m, color)));
  }

  for m in &result.keyword_matches {
    out.push_str(&format!("    keyword: {}\n", highlight(m, color)));
  }

  for track in &result.caption_track_matches {
    out.push_str(&format!("    {}:\n", track.language_name));
    for caption_match in &track.matches {
      out.push_str(&format!(
        "      [{}] {}\n",
        timestamp(caption_match.caption.at),
        highlight(&caption_match.excerpt, color)
      ));
    }
  }

  out
}

/// Mark the included hit ranges inside the excerpt text.
fn highlight(m: &PaddedMatch, color: bool) -> String {
  let (open, close) = if color { ("\x1b[1;33m", "\x1b[0m") } else { ("[", "]") };
  let text = &m.value;

  let mut out = String::with_capacity(text.len() + m.included.len() * 8);
  let mut cursor = 0;
  for included in &m.included {
    // Defensive against overlapping ranges: never move the cursor backwards.
    let start = included.start.max(cursor);
    let end = (included.start + included.length).min(text.len());
    if start >= end {
      continue;
    }
    out.push_str(&text[cursor..start]);
    out.push_str(open);
    out.push_str(&text[start..end]);
    out.push_str(close);
    cursor = end;
  }
  out.push_str(&text[cursor..]);
  out
}

/// `h:mm:ss`, or `m:ss` under an hour.
fn timestamp(seconds: u32) -> String {
  let (h, m, s) = (seconds / 3600, (seconds / 60) % 60, seconds % 60);
  if h > 0 {
    format!("{h}:{m:02}:{s:02}")
  } else {
    format!("{m}:{s:02}")
  }
}
