//! Namespace Module
//!
//! A disjoint partition of the keyspace holding the buckets of one tenant.
//!
//! ## Layout
//! ```text
//! Namespace "media"
//!   ├── d   DocBucket   (builtin)  documents
//!   ├── o   KvBucket    (builtin)  binary objects
//!   ├── t   KvBucket    (builtin)  chunks of every oversized value above
//!   └── ... KvBucket    (user)     created through create_bucket()
//! ```
//! Every bucket except `t` may store chunked values; they all share `t`.
//!
//! ## Persisted bucket list
//! `create_bucket` appends the name to a list stored inside the namespace;
//! `load_buckets` registers the stored names again after a restart.
//! `delete_bucket` leaves the stored list untouched.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, info, info_span, Span};

use crate::bucket::{DocBucket, KvBucket};
use crate::catalog;
use crate::codec::{Document, Meta};
use crate::engine::Engine;
use crate::error::{ArchiveError, Result};
use crate::keys::{self, BucketKind};

/// A binary object stored alongside a document by `put_doc_with_objects`
#[derive(Debug, Clone)]
pub struct Resource {
    pub key: Vec<u8>,
    pub data: Vec<u8>,
    pub meta: Option<Meta>,
}

impl Resource {
    pub fn new(key: impl Into<Vec<u8>>, data: impl Into<Vec<u8>>) -> Self {
        Self {
            key: key.into(),
            data: data.into(),
            meta: None,
        }
    }

    pub fn with_meta(mut self, meta: Meta) -> Self {
        self.meta = Some(meta);
        self
    }
}

pub struct Namespace {
    name: Vec<u8>,
    prefix: Vec<u8>,
    engine: Arc<Engine>,

    // Builtin buckets
    chunks: Arc<KvBucket>,
    doc: Arc<DocBucket>,
    object: Arc<KvBucket>,

    /// User buckets by name
    buckets: Mutex<HashMap<Vec<u8>, Arc<KvBucket>>>,

    span: Span,
}

impl Namespace {
    pub(crate) fn new(engine: Arc<Engine>, name: &[u8], parent: &Span) -> Self {
        let prefix = keys::namespace_prefix(name);
        let span = info_span!(parent: parent, "namespace", name = %keys::display(name));

        let chunks = Arc::new(KvBucket::new(
            engine.clone(),
            &prefix,
            BucketKind::Builtin,
            keys::CHUNK_BUCKET_NAME,
            None,
            &span,
        ));
        let doc = Arc::new(DocBucket::new(KvBucket::new(
            engine.clone(),
            &prefix,
            BucketKind::Builtin,
            keys::DOC_BUCKET_NAME,
            Some(chunks.clone()),
            &span,
        )));
        let object = Arc::new(KvBucket::new(
            engine.clone(),
            &prefix,
            BucketKind::Builtin,
            keys::OBJECT_BUCKET_NAME,
            Some(chunks.clone()),
            &span,
        ));

        Self {
            name: name.to_vec(),
            prefix,
            engine,
            chunks,
            doc,
            object,
            buckets: Mutex::new(HashMap::new()),
            span,
        }
    }

    pub fn name(&self) -> &[u8] {
        &self.name
    }

    /// Key prefix shared by everything stored in this namespace
    pub fn prefix(&self) -> &[u8] {
        &self.prefix
    }

    /// Builtin document bucket
    pub fn doc_bucket(&self) -> Arc<DocBucket> {
        self.doc.clone()
    }

    /// Builtin binary-object bucket
    pub fn object_bucket(&self) -> Arc<KvBucket> {
        self.object.clone()
    }

    /// Shared chunk bucket (read access for inspection)
    pub fn chunk_bucket(&self) -> Arc<KvBucket> {
        self.chunks.clone()
    }

    // =========================================================================
    // User Buckets
    // =========================================================================

    /// Get or create a user bucket
    ///
    /// The first creation persists the name to the namespace's bucket list
    /// (skipped on a read-only store).
    pub fn create_bucket(&self, name: &[u8]) -> Result<Arc<KvBucket>> {
        keys::validate_name("bucket", name)?;

        let mut buckets = self.buckets.lock();
        if let Some(bucket) = buckets.get(name) {
            return Ok(bucket.clone());
        }

        if !self.engine.is_read_only() {
            let list_key = keys::bucket_list_key(&self.prefix);
            self.engine
                .update(|tx| catalog::add_name(tx, &list_key, name))?;
        }

        let bucket = Arc::new(self.user_bucket(name));
        buckets.insert(name.to_vec(), bucket.clone());
        info!(parent: &self.span, bucket = %keys::display(name), "bucket created");
        Ok(bucket)
    }

    /// Remove every entry of a user bucket and the chunks they reference
    ///
    /// The handle stays registered; the bucket is empty afterwards. Fails
    /// with `NotFound` when the bucket was never created in this process.
    pub fn delete_bucket(&self, name: &[u8]) -> Result<()> {
        let bucket = self.buckets.lock().get(name).cloned().ok_or_else(|| {
            ArchiveError::NotFound(format!(
                "bucket {} in namespace {}",
                keys::display(name),
                keys::display(&self.name)
            ))
        })?;

        let removed = self.engine.update(|tx| bucket.clear_in(tx))?;
        info!(
            parent: &self.span,
            bucket = %keys::display(name),
            removed,
            "bucket deleted"
        );
        Ok(())
    }

    /// Names of the user buckets registered in this process, sorted
    pub fn list_buckets(&self) -> Vec<Vec<u8>> {
        let mut names: Vec<Vec<u8>> = self.buckets.lock().keys().cloned().collect();
        names.sort();
        names
    }

    /// Names in the persisted bucket list, in creation order
    pub fn stored_buckets(&self) -> Result<Vec<Vec<u8>>> {
        let snapshot = self.engine.view()?;
        catalog::read_names(&snapshot, &keys::bucket_list_key(&self.prefix))
    }

    /// Register every persisted bucket not yet known to this process;
    /// returns how many were added.
    pub fn load_buckets(&self) -> Result<usize> {
        let stored = self.stored_buckets()?;

        let mut buckets = self.buckets.lock();
        let mut added = 0;
        for name in stored {
            if buckets.contains_key(&name) {
                continue;
            }
            let bucket = Arc::new(self.user_bucket(&name));
            buckets.insert(name, bucket);
            added += 1;
        }

        debug!(parent: &self.span, added, "buckets loaded");
        Ok(added)
    }

    /// Delete every key of the namespace and unregister its user buckets;
    /// returns how many keys were removed
    ///
    /// Handles already given out stay usable and observe empty buckets.
    pub(crate) fn clear(&self) -> Result<usize> {
        let mut buckets = self.buckets.lock();
        let removed = self.engine.update(|tx| tx.delete_prefix(&self.prefix))?;
        buckets.clear();
        Ok(removed)
    }

    fn user_bucket(&self, name: &[u8]) -> KvBucket {
        KvBucket::new(
            self.engine.clone(),
            &self.prefix,
            BucketKind::User,
            name,
            Some(self.chunks.clone()),
            &self.span,
        )
    }

    // =========================================================================
    // Combined Writes
    // =========================================================================

    /// Store objects into the object bucket and the document that refers to
    /// them into the document bucket, in one transaction
    pub fn put_doc_with_objects(
        &self,
        doc_key: &[u8],
        doc: &Document,
        objects: &[Resource],
    ) -> Result<()> {
        self.engine.update(|tx| {
            for object in objects {
                self.object
                    .put_in(tx, &object.key, &object.data, object.meta.clone())?;
            }
            self.doc.put_doc_in(tx, doc_key, doc)
        })?;

        debug!(
            parent: self.doc.kv().span(),
            key = %keys::display(doc_key),
            objects = objects.len(),
            "document stored with objects"
        );
        Ok(())
    }
}
