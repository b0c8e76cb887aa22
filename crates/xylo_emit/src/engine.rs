use std::io::{self, Write};
use std::sync::Arc;

use tracing::trace;

use xylo_access::{AccessError, AccessorRegistry, Fetched, MappingContext, Node};
use xylo_access::{TypeRef, short_type_name};

use crate::error::EmitError;
use crate::forbid::Forbidder;
use crate::writer::MarkupWriter;

// -----------------------------------------------------------------------------
// IndentMode

/// Output layout of one serialization call.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum IndentMode {
    /// Document mode: declaration line, then indented elements.
    Document,
    /// Embedded-fragment mode: indented elements, no declaration.
    Fragment,
    /// Compact mode: no declaration, no whitespace.
    Compact,
}

impl IndentMode {
    fn is_pretty(self) -> bool {
        self != IndentMode::Compact
    }
}

// -----------------------------------------------------------------------------
// Serializer

/// The streaming tree serializer.
///
/// A `Serializer` holds only shared, read-mostly collaborators: the
/// [`MappingContext`] and an optional [`Forbidder`]. All traversal state
/// (the frame stack, text buffer and writer) is owned by a single call, so
/// one serializer can run concurrent serializations from many threads.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
/// use xylo_access::{AccessorDecl, Getter, MappingContext, MappingTable};
/// use xylo_emit::Serializer;
///
/// struct Point { x: u32, y: u32 }
///
/// let mut table = MappingTable::new();
/// table.insert::<Point>(vec![
///     AccessorDecl::attr("x", Getter::value(|p: &Point| &p.x)),
///     AccessorDecl::attr("y", Getter::value(|p: &Point| &p.y)),
/// ]);
/// let mut ctx = MappingContext::new();
/// ctx.set_provider(table);
///
/// let out = Serializer::new(Arc::new(ctx))
///     .to_markup_string(&Point { x: 1, y: 2 }, "point")
///     .unwrap();
/// assert_eq!(out, r#"<point x="1" y="2"/>"#);
/// ```
pub struct Serializer {
    ctx: Arc<MappingContext>,
    forbidder: Option<Arc<dyn Forbidder>>,
}

impl Serializer {
    /// Creates a serializer over a shared mapping context.
    pub fn new(ctx: Arc<MappingContext>) -> Self {
        Self {
            ctx,
            forbidder: None,
        }
    }

    /// Installs an inclusion filter, consulted before every child.
    pub fn with_forbidder(mut self, forbidder: impl Forbidder + 'static) -> Self {
        self.forbidder = Some(Arc::new(forbidder));
        self
    }

    /// Returns the mapping context.
    pub fn context(&self) -> &MappingContext {
        &self.ctx
    }

    /// Serializes the tree rooted at `root` into `sink`.
    ///
    /// The sink is flushed on every exit path, success or failure; after a
    /// failure its contents must be treated as invalid.
    pub fn serialize_tree<W: Write>(
        &self,
        root: &dyn Node,
        root_tag: &str,
        sink: &mut W,
        mode: IndentMode,
    ) -> Result<(), EmitError> {
        let mut emission = Emission {
            ctx: &self.ctx,
            forbidder: self.forbidder.as_deref(),
            writer: MarkupWriter::new(sink, mode.is_pretty()),
            stack: Vec::new(),
            text_buf: String::new(),
            mode,
        };

        let outcome = emission.run(root, root_tag);
        let flushed = emission.writer.flush();

        outcome?;
        flushed.map_err(io_ctx(root_tag))
    }

    /// Serializes `root` to a compact in-memory string.
    pub fn to_markup_string(&self, root: &dyn Node, root_tag: &str) -> Result<String, EmitError> {
        let mut buf = Vec::new();
        self.serialize_tree(root, root_tag, &mut buf, IndentMode::Compact)?;
        String::from_utf8(buf).map_err(|err| EmitError::Io {
            tag: root_tag.to_owned(),
            source: io::Error::new(io::ErrorKind::InvalidData, err),
        })
    }
}

// -----------------------------------------------------------------------------
// Traversal state

/// Per-element traversal state; one frame per open, unclosed element.
struct Frame<'v> {
    object: &'v dyn Node,
    registry: Arc<AccessorRegistry>,
    /// Cursor into the registry's tag-form specs.
    cursor: usize,
    /// While a sequence-valued accessor is being drained, the tag cursor is
    /// suspended and elements come from here.
    active: Option<MultiCursor<'v>>,
    /// Tag to emit when this frame is popped.
    close_tag: Box<str>,
    /// Whether the opening tag has been terminated with `>`.
    opened: bool,
    /// Whether any child element has been emitted.
    wrote_child: bool,
}

struct MultiCursor<'v> {
    items: std::vec::IntoIter<&'v dyn Node>,
    decl_tag: Arc<str>,
}

/// The owned state of one serialization call.
struct Emission<'e, 'v, W: Write> {
    ctx: &'e MappingContext,
    forbidder: Option<&'e dyn Forbidder>,
    writer: MarkupWriter<'e, W>,
    stack: Vec<Frame<'v>>,
    /// Reusable buffer leaves and attribute values render into.
    text_buf: String,
    mode: IndentMode,
}

impl<'e, 'v, W: Write> Emission<'e, 'v, W> {
    fn run(&mut self, root: &'v dyn Node, root_tag: &str) -> Result<(), EmitError> {
        if self.mode == IndentMode::Document {
            self.writer.declaration().map_err(io_ctx(root_tag))?;
        }

        self.open_element(root, root_tag, None)?;

        // One iteration handles one event: a child element, a cursor
        // transition, or a pop with its closing tag.
        while !self.stack.is_empty() {
            self.step()?;
        }
        Ok(())
    }

    fn step(&mut self) -> Result<(), EmitError> {
        let Some(top) = self.stack.last_mut() else {
            return Ok(());
        };

        // Both cursors exhausted: pop and close.
        if top.active.is_none() && top.cursor >= top.registry.tag_specs().len() {
            let Some(frame) = self.stack.pop() else {
                return Ok(());
            };
            let depth = self.stack.len();
            trace!(tag = &*frame.close_tag, "popped");
            return self
                .writer
                .close_tag(&frame.close_tag, depth, frame.opened, frame.wrote_child)
                .map_err(io_ctx(&frame.close_tag));
        }

        // Determine the next candidate child and its tag name.
        let candidate: Option<(&'v dyn Node, String, Option<TypeRef>)>;
        if let Some(cursor) = top.active.as_mut() {
            match cursor.items.next() {
                Some(element) => {
                    let decl_tag = cursor.decl_tag.clone();
                    let tag = if let Some(own) = self.ctx.self_tag_of(element) {
                        own.to_owned()
                    } else if &*decl_tag == "*" {
                        short_type_name(element.type_name()).to_owned()
                    } else {
                        decl_tag.as_ref().to_owned()
                    };
                    candidate = Some((element, tag, None));
                }
                None => {
                    trace!("sequence finished");
                    top.active = None;
                    return Ok(());
                }
            }
        } else {
            // The tag cursor advances exactly once per spec, whatever the
            // accessor yields.
            let registry = top.registry.clone();
            let object = top.object;
            let at = top.cursor;
            top.cursor += 1;

            let spec = &registry.tag_specs()[at];
            let fetched = spec
                .fetch(object)
                .map_err(access_ctx(spec.tag_name(), object.type_name()))?;

            match fetched {
                Fetched::Absent => candidate = None,
                Fetched::One(child) => {
                    candidate = Some((child, spec.tag_name().to_owned(), spec.declared_type()));
                }
                Fetched::Many(items) => {
                    trace!(tag = spec.tag_name(), len = items.len(), "opened sequence");
                    top.active = Some(MultiCursor {
                        items: items.into_iter(),
                        decl_tag: spec.shared_tag(),
                    });
                    candidate = None;
                }
            }
        }

        let Some((child, tag, expected)) = candidate else {
            return Ok(());
        };

        if let Some(forbidder) = self.forbidder {
            if !forbidder.permit(&tag, child) {
                trace!(tag = %tag, "child forbidden");
                return Ok(());
            }
        }

        self.open_element(child, &tag, expected)
    }

    /// Writes the opening tag (and, for leaves, the whole element) of
    /// `child`, pushing a frame for non-leaf values.
    fn open_element(
        &mut self,
        child: &'v dyn Node,
        tag: &str,
        expected: Option<TypeRef>,
    ) -> Result<(), EmitError> {
        // The parent's opening tag stays open until its first child.
        if let Some(parent) = self.stack.last_mut() {
            if !parent.opened {
                self.writer.raw(">").map_err(io_ctx(tag))?;
                self.writer.line_break().map_err(io_ctx(tag))?;
                parent.opened = true;
            }
            parent.wrote_child = true;
        }

        let depth = self.stack.len();
        self.writer.indent(depth).map_err(io_ctx(tag))?;
        self.writer.raw("<").map_err(io_ctx(tag))?;
        self.writer.raw(tag).map_err(io_ctx(tag))?;

        if self.ctx.leaves().is_leaf(child.ty_id()) {
            self.writer.raw(">").map_err(io_ctx(tag))?;
            self.text_buf.clear();
            self.ctx
                .leaves()
                .render(child, &mut self.text_buf)
                .map_err(access_ctx(tag, child.type_name()))?;
            self.writer
                .escaped(&self.text_buf)
                .map_err(io_ctx(tag))?;
            self.writer.raw("</").map_err(io_ctx(tag))?;
            self.writer.raw(tag).map_err(io_ctx(tag))?;
            self.writer.raw(">").map_err(io_ctx(tag))?;
            return self.writer.line_break().map_err(io_ctx(tag));
        }

        let owner = TypeRef::of_val(child);
        let registry = self
            .ctx
            .registry_of(child)
            .map_err(|source| EmitError::Registry {
                tag: tag.to_owned(),
                source,
            })?;
        trace!(tag, ty = owner.name(), "descending");

        // Polymorphism discriminator: written when the concrete type is not
        // the statically declared one (an unknown declaration counts as
        // differing) and a nickname is registered.
        if expected.is_none_or(|declared| declared.id() != owner.id()) {
            if let Some(nick) = self.ctx.nick_for(owner.id()) {
                self.writer.attribute("type", nick).map_err(io_ctx(tag))?;
            }
        }

        for spec in registry.attr_specs() {
            match spec
                .fetch(child)
                .map_err(access_ctx(tag, owner.name()))?
            {
                Fetched::Absent => {}
                Fetched::One(value) => {
                    self.text_buf.clear();
                    self.ctx
                        .leaves()
                        .render(value, &mut self.text_buf)
                        .map_err(access_ctx(tag, owner.name()))?;
                    self.writer
                        .attribute(spec.tag_name(), &self.text_buf)
                        .map_err(io_ctx(tag))?;
                }
                Fetched::Many(_) => {
                    return Err(EmitError::Access {
                        tag: tag.to_owned(),
                        type_name: owner.name(),
                        source: AccessError::Message(format!(
                            "attribute accessor `{}` produced a sequence",
                            spec.tag_name()
                        )),
                    });
                }
            }
        }

        if let Some(extra) = registry.as_extra_attrs(child) {
            for (name, value) in extra.extra_attrs() {
                self.writer
                    .attribute(&name, &value)
                    .map_err(io_ctx(tag))?;
            }
        }

        // A present body value terminates the opening tag and writes the
        // element text before any children.
        let mut opened = false;
        if let Some(body) = registry.body_spec() {
            match body.fetch(child).map_err(access_ctx(tag, owner.name()))? {
                Fetched::Absent => {}
                Fetched::One(value) => {
                    self.text_buf.clear();
                    self.ctx
                        .leaves()
                        .render(value, &mut self.text_buf)
                        .map_err(access_ctx(tag, owner.name()))?;
                    self.writer.raw(">").map_err(io_ctx(tag))?;
                    self.writer
                        .escaped(&self.text_buf)
                        .map_err(io_ctx(tag))?;
                    opened = true;
                }
                Fetched::Many(_) => {
                    return Err(EmitError::Access {
                        tag: tag.to_owned(),
                        type_name: owner.name(),
                        source: AccessError::Message(
                            "body accessor produced a sequence".to_owned(),
                        ),
                    });
                }
            }
        }

        self.stack.push(Frame {
            object: child,
            registry,
            cursor: 0,
            active: None,
            close_tag: tag.into(),
            opened,
            wrote_child: false,
        });
        Ok(())
    }
}

// -----------------------------------------------------------------------------
// Error context helpers

fn io_ctx(tag: &str) -> impl FnOnce(io::Error) -> EmitError + '_ {
    move |source| EmitError::Io {
        tag: tag.to_owned(),
        source,
    }
}

fn access_ctx<'a>(
    tag: &'a str,
    type_name: &'static str,
) -> impl FnOnce(AccessError) -> EmitError + 'a {
    move |source| EmitError::Access {
        tag: tag.to_owned(),
        type_name,
        source,
    }
}
