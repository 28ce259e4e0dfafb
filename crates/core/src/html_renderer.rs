use std::io::{self, Write};

use crate::block::{Block, Header, List, ListItem, Table};
use crate::inline::{render_spans, render_text};
use crate::options::HtmlOptions;

/// Header levels that take part in anchor paths and numbering.
const TRACKED_LEVELS: usize = 10;

pub struct HtmlRenderer<'o, W: Write> {
    writer: W,
    options: &'o HtmlOptions,
    numbered: bool,
    keys: Vec<String>,
    counters: Vec<usize>,
}

impl<'o, W: Write> HtmlRenderer<'o, W> {
    pub fn new(writer: W, options: &'o HtmlOptions) -> Self {
        Self {
            writer,
            options,
            numbered: options.numbered,
            keys: vec![String::new(); TRACKED_LEVELS],
            counters: vec![0; TRACKED_LEVELS],
        }
    }

    pub fn render<'b, I>(mut self, blocks: I) -> io::Result<W>
    where
        I: IntoIterator<Item = &'b Block>,
    {
        for block in blocks {
            match block {
                Block::Header(header) => self.write_header(header)?,
                Block::Paragraph { spans } => {
                    self.writer.write_all(b"<p>")?;
                    self.writer.write_all(render_spans(spans).as_bytes())?;
                    self.writer.write_all(b"</p>\n")?;
                }
                Block::Quote { spans } => {
                    self.writer.write_all(b"<blockquote>")?;
                    self.writer.write_all(render_spans(spans).as_bytes())?;
                    self.writer.write_all(b"</blockquote>\n")?;
                }
                Block::List(list) => self.write_list(list)?,
                Block::Table(table) => self.write_table(table)?,
                Block::Code { lang, lines } => {
                    self.writer.write_all(b"<pre class='")?;
                    self.escape_attr(lang)?;
                    self.writer.write_all(b"'>\n")?;
                    for line in lines {
                        self.escape_html(line)?;
                        self.writer.write_all(b"\n")?;
                    }
                    self.writer.write_all(b"</pre>\n")?;
                }
                Block::Command { name, .. } if name == "nh" => self.numbered = true,
                Block::Command { .. } | Block::Data { .. } => {}
            }
        }

        Ok(self.writer)
    }

    fn write_header(&mut self, header: &Header) -> io::Result<()> {
        let text = render_spans(&header.spans);
        if header.level == 0 {
            return writeln!(self.writer, "<div class='title'>{text}</div>");
        }

        let index = header.level.min(TRACKED_LEVELS) - 1;
        self.keys[index].clone_from(&header.key);
        self.counters[index] += 1;
        for deeper in index + 1..TRACKED_LEVELS {
            self.keys[deeper].clear();
            self.counters[deeper] = 0;
        }

        let path = self.keys[..=index].join("/");
        let text = if self.numbered {
            let number: String = self.counters[..=index]
                .iter()
                .map(|n| format!("{n}."))
                .collect();
            format!("{number} {text}")
        } else {
            text
        };

        let tag = header.level.min(6);
        write!(self.writer, "<h{tag}")?;
        self.write_attr("id", &path)?;
        self.writer.write_all(b">")?;
        match &self.options.url_base {
            Some(base) => {
                self.writer.write_all(b"<a href='")?;
                self.escape_attr(base)?;
                self.writer.write_all(b"/")?;
                self.escape_attr(&path)?;
                write!(self.writer, "'>{text}</a>")?;
            }
            None => self.writer.write_all(text.as_bytes())?,
        }
        writeln!(self.writer, "</h{tag}>")
    }

    fn write_list(&mut self, list: &List) -> io::Result<()> {
        let mut pos = 0;
        self.write_list_level(list.kind.tag(), &list.items, &mut pos, 1)
    }

    /// Writes items at `level` until a shallower item. A deeper item opens a
    /// nested list inside the preceding `<li>`.
    fn write_list_level(
        &mut self,
        tag: &str,
        items: &[ListItem],
        pos: &mut usize,
        level: usize,
    ) -> io::Result<()> {
        writeln!(self.writer, "<{tag}>")?;
        while let Some(item) = items.get(*pos) {
            if item.level < level {
                break;
            }
            if item.level > level {
                self.writer.write_all(b"<li>\n")?;
                self.write_list_level(tag, items, pos, level + 1)?;
                self.writer.write_all(b"</li>\n")?;
                continue;
            }

            self.write_item_open(&item.text)?;
            *pos += 1;
            if items.get(*pos).is_some_and(|next| next.level > level) {
                self.writer.write_all(b"\n")?;
                self.write_list_level(tag, items, pos, level + 1)?;
            }
            self.writer.write_all(b"</li>\n")?;
        }
        writeln!(self.writer, "</{tag}>")
    }

    fn write_item_open(&mut self, text: &str) -> io::Result<()> {
        let mark = match text.get(..3) {
            Some("[x]") => Some("<span class='ballot-no'>☒</span>"),
            Some("[ ]") => Some("☐"),
            Some("[/]") => Some("<span class='ballot-yes'>☑</span>"),
            _ => None,
        };
        match mark {
            Some(mark) => write!(
                self.writer,
                "<li class='tasklist'>{mark}{}",
                render_text(&text[3..])
            ),
            None => write!(self.writer, "<li>{}", render_text(text)),
        }
    }

    fn write_table(&mut self, table: &Table) -> io::Result<()> {
        match table.class() {
            Some(class) => writeln!(self.writer, "<table class='{class}'>")?,
            None => self.writer.write_all(b"<table>\n")?,
        }
        for (r, row) in table.rows.iter().enumerate() {
            self.writer.write_all(b"<tr>\n")?;
            for (c, cell) in row.iter().enumerate() {
                let tag = if table.is_header_cell(r, c) { "th" } else { "td" };
                write!(self.writer, "<{tag}>{}</{tag}>", render_text(&cell.text))?;
            }
            self.writer.write_all(b"\n</tr>\n")?;
        }
        self.writer.write_all(b"</table>\n")
    }

    fn escape_html(&mut self, text: &str) -> io::Result<()> {
        for ch in text.chars() {
            match ch {
                '&' => self.writer.write_all(b"&amp;")?,
                '<' => self.writer.write_all(b"&lt;")?,
                '>' => self.writer.write_all(b"&gt;")?,
                '"' => self.writer.write_all(b"&quot;")?,
                '\'' => self.writer.write_all(b"&#39;")?,
                _ => self
                    .writer
                    .write_all(ch.encode_utf8(&mut [0; 4]).as_bytes())?,
            }
        }
        Ok(())
    }

    fn escape_attr(&mut self, value: &str) -> io::Result<()> {
        self.escape_html(value)
    }

    fn write_attr(&mut self, key: &str, value: &str) -> io::Result<()> {
        write!(self.writer, " {}=\"", key)?;
        self.escape_attr(value)?;
        self.writer.write_all(b"\"")
    }
}
