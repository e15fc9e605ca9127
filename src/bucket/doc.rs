//! Document bucket

use tracing::debug;

use crate::codec::{decode_document, encode_document, Document, Meta, Query};
use crate::engine::Tx;
use crate::error::Result;
use crate::iterator::{BucketIterator, DocIterator};

use super::{Bucket, DocumentStore, KvBucket};

/// The builtin document bucket of a namespace
///
/// Documents are stored inline, without meta. Every `Bucket` operation is
/// available as well and behaves exactly like on a `KvBucket`.
pub struct DocBucket {
    inner: KvBucket,
}

impl DocBucket {
    pub(crate) fn new(inner: KvBucket) -> Self {
        Self { inner }
    }

    /// Bucket name
    pub fn name(&self) -> &[u8] {
        self.inner.name()
    }

    pub(crate) fn put_doc_in(&self, tx: &mut Tx<'_>, key: &[u8], doc: &Document) -> Result<()> {
        let encoded = encode_document(doc)?;
        self.inner.put_in(tx, key, &encoded, None)
    }

    pub(crate) fn kv(&self) -> &KvBucket {
        &self.inner
    }
}

impl DocumentStore for DocBucket {
    fn put_doc(&self, key: &[u8], doc: &Document) -> Result<()> {
        let encoded = encode_document(doc)?;
        self.inner.put(key, &encoded, None)
    }

    fn get_doc(&self, key: &[u8]) -> Result<Document> {
        let (encoded, _) = self.inner.get(key)?;
        decode_document(&encoded)
    }

    fn find(&self, query: &Query) -> Result<DocIterator> {
        if !query.is_empty() {
            debug!(
                parent: self.inner.span(),
                fields = query.len(),
                "query filters are not applied; scanning every document"
            );
        }
        Ok(DocIterator::new(self.inner.range(None, None, true)?))
    }
}

impl Bucket for DocBucket {
    fn put(&self, key: &[u8], value: &[u8], meta: Option<Meta>) -> Result<()> {
        self.inner.put(key, value, meta)
    }

    fn put_val(&self, value: &[u8], meta: Option<Meta>) -> Result<Vec<u8>> {
        self.inner.put_val(value, meta)
    }

    fn get(&self, key: &[u8]) -> Result<(Vec<u8>, Option<Meta>)> {
        self.inner.get(key)
    }

    fn get_at(&self, key: &[u8], buf: &mut [u8], offset: usize) -> Result<usize> {
        self.inner.get_at(key, buf, offset)
    }

    fn get_meta(&self, key: &[u8]) -> Result<Option<Meta>> {
        self.inner.get_meta(key)
    }

    fn exists(&self, key: &[u8]) -> Result<bool> {
        self.inner.exists(key)
    }

    fn delete(&self, key: &[u8]) -> Result<()> {
        self.inner.delete(key)
    }

    fn range(
        &self,
        begin: Option<&[u8]>,
        end: Option<&[u8]>,
        reverse: bool,
    ) -> Result<BucketIterator> {
        self.inner.range(begin, end, reverse)
    }

    fn count(&self, begin: Option<&[u8]>, end: Option<&[u8]>) -> Result<usize> {
        self.inner.count(begin, end)
    }
}
