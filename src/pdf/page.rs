//! Page-level view of a document as seen by the watermark engine
//!
//! The engine never touches a concrete PDF library directly. It reads and
//! writes pages through these traits, which [`crate::pdf::document`]
//! implements for `lopdf::Document`.

use std::fmt;

use lopdf::Dictionary;

use crate::content::Token;
use crate::error::Result;

/// Resource sub-dictionary a watermark candidate lives in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    /// Drawable objects (`/XObject`): images and forms
    XObject,
    /// Named graphics states (`/ExtGState`)
    ExtGState,
}

impl ResourceKind {
    /// Key of this sub-dictionary inside a `/Resources` dictionary
    pub fn key(&self) -> &'static [u8] {
        match self {
            ResourceKind::XObject => b"XObject",
            ResourceKind::ExtGState => b"ExtGState",
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResourceKind::XObject => f.write_str("XObject"),
            ResourceKind::ExtGState => f.write_str("ExtGState"),
        }
    }
}

/// A resolved resource entry
#[derive(Debug, Clone)]
pub enum Resource {
    /// Image XObject, with its stream dictionary
    Image(Dictionary),
    /// Form XObject, with its stream dictionary. `/OC` and the groups it
    /// refers to are resolved inline.
    Form(Dictionary),
    /// Extended graphics state dictionary
    GraphicsState(Dictionary),
    /// Anything else (e.g. PostScript XObjects)
    Other,
}

/// Read access to one page's resources and content
pub trait ResourceView {
    /// Names of the entries in the page's resource sub-dictionary of `kind`
    fn resource_names(&self, kind: ResourceKind) -> Vec<Vec<u8>>;

    /// Resolve a named entry to a typed value
    fn resolve_resource(&self, kind: ResourceKind, name: &[u8]) -> Result<Resource>;

    /// The page's content stream as a flat token sequence
    fn content_tokens(&self) -> Result<Vec<Token>>;
}

/// Write access to one page
pub trait PageContent: ResourceView {
    /// Remove a named entry from the page's resources. Missing entries are ignored.
    fn remove_resource(&mut self, kind: ResourceKind, name: &[u8]);

    /// Serialize `tokens` and install them as the page's content.
    ///
    /// Implementations must leave the page untouched when this fails.
    fn set_content_tokens(&mut self, tokens: Vec<Token>) -> Result<()>;
}

/// A document as an ordered sequence of pages
pub trait PageTree {
    type PageId: Copy + fmt::Debug;
    type View<'a>: ResourceView
    where
        Self: 'a;
    type Page<'a>: PageContent
    where
        Self: 'a;

    /// Page ids in document order
    fn page_ids(&self) -> Vec<Self::PageId>;

    /// Read-only access to one page
    fn view(&self, id: Self::PageId) -> Self::View<'_>;

    /// Mutable access to one page
    fn page(&mut self, id: Self::PageId) -> Self::Page<'_>;
}

impl<T: ResourceView + ?Sized> ResourceView for &T {
    fn resource_names(&self, kind: ResourceKind) -> Vec<Vec<u8>> {
        (**self).resource_names(kind)
    }

    fn resolve_resource(&self, kind: ResourceKind, name: &[u8]) -> Result<Resource> {
        (**self).resolve_resource(kind, name)
    }

    fn content_tokens(&self) -> Result<Vec<Token>> {
        (**self).content_tokens()
    }
}

impl<T: ResourceView + ?Sized> ResourceView for &mut T {
    fn resource_names(&self, kind: ResourceKind) -> Vec<Vec<u8>> {
        (**self).resource_names(kind)
    }

    fn resolve_resource(&self, kind: ResourceKind, name: &[u8]) -> Result<Resource> {
        (**self).resolve_resource(kind, name)
    }

    fn content_tokens(&self) -> Result<Vec<Token>> {
        (**self).content_tokens()
    }
}

impl<T: PageContent + ?Sized> PageContent for &mut T {
    fn remove_resource(&mut self, kind: ResourceKind, name: &[u8]) {
        (**self).remove_resource(kind, name)
    }

    fn set_content_tokens(&mut self, tokens: Vec<Token>) -> Result<()> {
        (**self).set_content_tokens(tokens)
    }
}
