//! lopdf binding of the page traits

use std::io::Write;

use flate2::write::ZlibEncoder;
use flate2::Compression;
use lopdf::content::Content;
use lopdf::{dictionary, Dictionary, Document, Object, ObjectId, Stream};

use crate::content::{assemble, encode_content, tokenize, Token};
use crate::error::{Error, Result};
use super::page::{PageContent, PageTree, Resource, ResourceKind, ResourceView};

/// Longest reference chain or page tree we are willing to follow
const MAX_DEPTH: usize = 32;

/// Read-only handle on one page of a lopdf document
#[derive(Debug, Clone, Copy)]
pub struct PageView<'a> {
    doc: &'a Document,
    page_id: ObjectId,
}

impl<'a> PageView<'a> {
    pub fn new(doc: &'a Document, page_id: ObjectId) -> Self {
        Self { doc, page_id }
    }
}

/// Mutable handle on one page of a lopdf document
#[derive(Debug)]
pub struct PageMut<'a> {
    doc: &'a mut Document,
    page_id: ObjectId,
}

impl<'a> PageMut<'a> {
    pub fn new(doc: &'a mut Document, page_id: ObjectId) -> Self {
        Self { doc, page_id }
    }

    fn view(&self) -> PageView<'_> {
        PageView::new(&*self.doc, self.page_id)
    }
}

/// Follow references until a direct object is reached
fn resolve<'a>(doc: &'a Document, mut object: &'a Object) -> Result<&'a Object> {
    for _ in 0..MAX_DEPTH {
        match object {
            Object::Reference(id) => object = doc.get_object(*id)?,
            _ => return Ok(object),
        }
    }
    Err(Error::General("Reference chain too deep".to_string()))
}

/// The page's `/Resources`, inherited from the nearest ancestor if the page has none
fn page_resources(doc: &Document, page_id: ObjectId) -> Option<&Dictionary> {
    let mut node = doc.get_dictionary(page_id).ok()?;
    for _ in 0..MAX_DEPTH {
        if let Ok(resources) = node.get(b"Resources") {
            return resolve(doc, resources).ok()?.as_dict().ok();
        }
        let parent = node.get(b"Parent").and_then(Object::as_reference).ok()?;
        node = doc.get_dictionary(parent).ok()?;
    }
    None
}

fn sub_dictionary<'a>(doc: &'a Document, resources: &'a Dictionary, kind: ResourceKind) -> Option<&'a Dictionary> {
    let entry = resources.get(kind.key()).ok()?;
    resolve(doc, entry).ok()?.as_dict().ok()
}

/// Copy of a form dictionary with `/OC` and its `/OCGs` resolved inline
fn inline_optional_content(doc: &Document, form: &Dictionary) -> Dictionary {
    let mut form = form.clone();

    let mut oc = match form.get(b"OC").ok().and_then(|oc| resolve(doc, oc).ok()) {
        Some(Object::Dictionary(oc)) => oc.clone(),
        _ => return form,
    };

    let groups = match oc.get(b"OCGs").ok().and_then(|groups| resolve(doc, groups).ok()) {
        Some(Object::Array(items)) => Some(Object::Array(
            items
                .iter()
                .filter_map(|item| resolve(doc, item).ok().cloned())
                .collect(),
        )),
        Some(group) => Some(group.clone()),
        None => None,
    };
    if let Some(groups) = groups {
        oc.set("OCGs", groups);
    }

    form.set("OC", Object::Dictionary(oc));
    form
}

fn deflate(data: &[u8]) -> std::io::Result<Vec<u8>> {
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(data)?;
    encoder.finish()
}

impl ResourceView for PageView<'_> {
    fn resource_names(&self, kind: ResourceKind) -> Vec<Vec<u8>> {
        page_resources(self.doc, self.page_id)
            .and_then(|resources| sub_dictionary(self.doc, resources, kind))
            .map(|entries| entries.iter().map(|(name, _)| name.clone()).collect())
            .unwrap_or_default()
    }

    fn resolve_resource(&self, kind: ResourceKind, name: &[u8]) -> Result<Resource> {
        let entries = page_resources(self.doc, self.page_id)
            .and_then(|resources| sub_dictionary(self.doc, resources, kind))
            .ok_or_else(|| Error::resolution(kind, name, "page has no such resource dictionary"))?;

        let entry = entries
            .get(name)
            .map_err(|_| Error::resolution(kind, name, "no such entry"))?;
        let object = resolve(self.doc, entry)
            .map_err(|e| Error::resolution(kind, name, e.to_string()))?;

        match kind {
            ResourceKind::XObject => {
                let stream = object
                    .as_stream()
                    .map_err(|_| Error::resolution(kind, name, "XObject is not a stream"))?;
                let resource = match stream.dict.get(b"Subtype").and_then(Object::as_name) {
                    Ok(b"Image") => Resource::Image(stream.dict.clone()),
                    Ok(b"Form") => Resource::Form(inline_optional_content(self.doc, &stream.dict)),
                    _ => Resource::Other,
                };
                Ok(resource)
            }
            ResourceKind::ExtGState => {
                let dict = object
                    .as_dict()
                    .map_err(|_| Error::resolution(kind, name, "graphics state is not a dictionary"))?;
                Ok(Resource::GraphicsState(dict.clone()))
            }
        }
    }

    fn content_tokens(&self) -> Result<Vec<Token>> {
        let bytes = self.doc.get_page_content(self.page_id)?;
        let content = Content::decode(&bytes)?;
        Ok(tokenize(&content))
    }
}

impl ResourceView for PageMut<'_> {
    fn resource_names(&self, kind: ResourceKind) -> Vec<Vec<u8>> {
        self.view().resource_names(kind)
    }

    fn resolve_resource(&self, kind: ResourceKind, name: &[u8]) -> Result<Resource> {
        self.view().resolve_resource(kind, name)
    }

    fn content_tokens(&self) -> Result<Vec<Token>> {
        self.view().content_tokens()
    }
}

impl PageContent for PageMut<'_> {
    /// The page gets its own inline copy of the resource dictionary (and of
    /// the affected sub-dictionary) before the entry is removed, so pages
    /// sharing the original dictionary are not affected.
    fn remove_resource(&mut self, kind: ResourceKind, name: &[u8]) {
        let Some(mut resources) = page_resources(&*self.doc, self.page_id).cloned() else {
            return;
        };
        let Some(mut entries) = sub_dictionary(&*self.doc, &resources, kind).cloned() else {
            return;
        };
        if entries.remove(name).is_none() {
            return;
        }
        resources.set(kind.key().to_vec(), Object::Dictionary(entries));

        if let Ok(Object::Dictionary(ref mut page_dict)) = self.doc.get_object_mut(self.page_id) {
            page_dict.set("Resources", Object::Dictionary(resources));
        }
    }

    fn set_content_tokens(&mut self, tokens: Vec<Token>) -> Result<()> {
        let encoded = encode_content(&assemble(tokens))?;
        let compressed = deflate(&encoded).map_err(|e| Error::Commit {
            reason: format!("compression failed: {}", e),
        })?;

        if self.doc.get_dictionary(self.page_id).is_err() {
            return Err(Error::Commit {
                reason: format!("page {:?} is not a dictionary", self.page_id),
            });
        }

        let mut stream = Stream::new(dictionary! { "Filter" => "FlateDecode" }, compressed);
        stream.allows_compression = false;
        let content_id = self.doc.add_object(stream);

        if let Ok(Object::Dictionary(ref mut page_dict)) = self.doc.get_object_mut(self.page_id) {
            page_dict.set("Contents", Object::Reference(content_id));
        }

        Ok(())
    }
}

impl PageTree for Document {
    type PageId = ObjectId;
    type View<'a> = PageView<'a> where Self: 'a;
    type Page<'a> = PageMut<'a> where Self: 'a;

    fn page_ids(&self) -> Vec<ObjectId> {
        self.get_pages().into_values().collect()
    }

    fn view(&self, id: ObjectId) -> PageView<'_> {
        PageView::new(self, id)
    }

    fn page(&mut self, id: ObjectId) -> PageMut<'_> {
        PageMut::new(self, id)
    }
}
