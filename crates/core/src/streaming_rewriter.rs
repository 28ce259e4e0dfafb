//! Post-processing of rendered HTML through lol_html, chunk by chunk.
//!
//! `Document::write_html` accepts any writer, so a [`StreamingRewriter`] can
//! sit between the renderer and the final destination without buffering the
//! whole page.

use lol_html::errors::RewritingError;
use lol_html::{ElementContentHandlers, HtmlRewriter, OutputSink, Selector, Settings, element};
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::cell::RefCell;
use std::io::{self, Write};
use std::rc::Rc;

/// Rewrites applied to rendered document HTML.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RewriteOptions {
    /// Default missing `loading` attributes on `<img>` tags to `lazy`.
    pub enforce_img_loading_lazy: bool,
    /// Add `rel="noopener noreferrer"` to links that point off-site.
    pub external_links_noopener: bool,
}

impl Default for RewriteOptions {
    fn default() -> Self {
        RewriteOptions {
            enforce_img_loading_lazy: true,
            external_links_noopener: false,
        }
    }
}

/// A [`Write`] adapter that pushes HTML through lol_html into `W`.
///
/// The destination is shared with lol_html's output sink through a single
/// `Rc<RefCell<Option<W>>>`; sink write errors are parked and surfaced on the
/// next call.
pub struct StreamingRewriter<W: Write> {
    rewriter: Option<HtmlRewriter<'static, OutputProxy<W>>>,
    target: Rc<RefCell<Option<W>>>,
    sink_error: Rc<RefCell<Option<io::Error>>>,
}

impl<W: Write> StreamingRewriter<W> {
    pub fn new(writer: W, options: RewriteOptions) -> Self {
        let target = Rc::new(RefCell::new(Some(writer)));
        let sink_error = Rc::new(RefCell::new(None));
        let output_sink = OutputProxy {
            target: Rc::clone(&target),
            sink_error: Rc::clone(&sink_error),
        };
        let rewriter = HtmlRewriter::new(options.settings(), output_sink);

        Self {
            rewriter: Some(rewriter),
            target,
            sink_error,
        }
    }

    /// Finishes rewriting and returns the destination writer.
    pub fn into_inner(mut self) -> io::Result<W> {
        self.finish()?;

        let cell = Rc::try_unwrap(self.target)
            .map_err(|_| io::Error::other("rewriter output still borrowed"))?;

        cell.into_inner()
            .ok_or_else(|| io::Error::new(io::ErrorKind::BrokenPipe, "writer missing"))
    }

    fn finish(&mut self) -> io::Result<()> {
        if let Some(rewriter) = self.rewriter.take() {
            rewriter.end().map_err(rewriting_error)?;
        }
        take_sink_error(&self.sink_error)
    }
}

impl<W: Write> Write for StreamingRewriter<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let rewriter = self
            .rewriter
            .as_mut()
            .ok_or_else(|| io::Error::new(io::ErrorKind::BrokenPipe, "rewriter finished"))?;

        rewriter.write(buf).map_err(rewriting_error)?;
        take_sink_error(&self.sink_error)?;
        Ok(buf.len())
    }

    /// Flushes the destination only. lol_html may still hold a partial tag;
    /// that is written out by `into_inner`.
    fn flush(&mut self) -> io::Result<()> {
        take_sink_error(&self.sink_error)?;
        match self.target.borrow_mut().as_mut() {
            Some(writer) => writer.flush(),
            None => Ok(()),
        }
    }
}

type Handler = (Cow<'static, Selector>, ElementContentHandlers<'static>);

impl RewriteOptions {
    fn settings(&self) -> Settings<'static, 'static> {
        let mut settings = Settings::default();
        let mut handlers = Vec::new();

        if self.enforce_img_loading_lazy {
            handlers.push(lazy_img_handler());
        }
        if self.external_links_noopener {
            handlers.push(noopener_handler());
        }

        settings.element_content_handlers = handlers;
        settings
    }
}

fn lazy_img_handler() -> Handler {
    element!("img", |el| {
        if el.get_attribute("loading").is_none() {
            el.set_attribute("loading", "lazy")?;
        }
        Ok(())
    })
}

fn noopener_handler() -> Handler {
    element!("a[href^='http']", |el| {
        el.set_attribute("rel", "noopener noreferrer")?;
        Ok(())
    })
}

fn take_sink_error(cell: &RefCell<Option<io::Error>>) -> io::Result<()> {
    match cell.borrow_mut().take() {
        Some(err) => Err(err),
        None => Ok(()),
    }
}

fn rewriting_error(err: RewritingError) -> io::Error {
    io::Error::other(err)
}

struct OutputProxy<W: Write> {
    target: Rc<RefCell<Option<W>>>,
    sink_error: Rc<RefCell<Option<io::Error>>>,
}

impl<W: Write> OutputSink for OutputProxy<W> {
    fn handle_chunk(&mut self, chunk: &[u8]) {
        if chunk.is_empty() || self.sink_error.borrow().is_some() {
            return;
        }

        if let Some(writer) = self.target.borrow_mut().as_mut() {
            if let Err(err) = writer.write_all(chunk) {
                *self.sink_error.borrow_mut() = Some(err);
            }
        }
    }
}
