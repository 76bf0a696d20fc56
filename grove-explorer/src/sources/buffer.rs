use std::path::Path;
use std::sync::Arc;

use grove_tree::{NodeSeed, NodeUid};

use crate::errors::Result;
use crate::host::{BoxFuture, BufferList};
use crate::model::{
    BufferEntry, NodeSnapshot, Payload, RootEntry, Seed, SourceKind,
};
use crate::provider::{LoadContext, NodeProvider};

const SCOPE: &str = "buffer";

/// Lists the host's listed buffers under a single root.
pub struct BufferProvider {
    buffers: Arc<dyn BufferList>,
}

impl BufferProvider {
    pub fn new(buffers: Arc<dyn BufferList>) -> Self {
        Self { buffers }
    }

    pub fn uid(bufnr: u32) -> NodeUid {
        NodeUid::new(SCOPE, &bufnr.to_string())
    }

    fn root_uid() -> NodeUid {
        NodeUid::new(SCOPE, "")
    }
}

impl NodeProvider for BufferProvider {
    fn kind(&self) -> SourceKind {
        SourceKind::Buffer
    }

    fn root(&self, _path: Option<&Path>) -> Seed {
        NodeSeed::branch(
            Self::root_uid(),
            Payload::Root(RootEntry {
                label: String::from("BUFFERS"),
                path: None,
            }),
        )
    }

    fn load_children(
        &self,
        parent: NodeSnapshot,
        _context: LoadContext,
    ) -> BoxFuture<'static, Result<Vec<Seed>>> {
        if parent.uid != Self::root_uid() {
            return Box::pin(async { Ok(Vec::new()) });
        }

        let listing = self.buffers.buffers();
        Box::pin(async move {
            let mut buffers: Vec<_> = listing
                .await
                .into_iter()
                .filter(|buffer| buffer.listed)
                .collect();
            buffers.sort_by_key(|buffer| buffer.bufnr);
            Ok(buffers
                .into_iter()
                .map(|buffer| {
                    NodeSeed::leaf(
                        Self::uid(buffer.bufnr),
                        Payload::Buffer(BufferEntry {
                            bufnr: buffer.bufnr,
                            name: buffer.name,
                            path: buffer.path,
                            modified: buffer.modified,
                            visible: buffer.visible,
                            current: buffer.current,
                        }),
                    )
                })
                .collect())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fake::FakeBuffers;
    use crate::host::BufferInfo;

    fn buffer(bufnr: u32, name: &str, listed: bool) -> BufferInfo {
        BufferInfo {
            bufnr,
            name: name.to_string(),
            path: None,
            modified: false,
            visible: false,
            current: false,
            listed,
        }
    }

    #[tokio::test]
    async fn given_buffers_when_loaded_then_listed_ones_follow_bufnr() {
        let buffers = FakeBuffers::new(vec![
            buffer(7, "b.rs", true),
            buffer(2, "a.rs", true),
            buffer(3, "help.txt", false),
        ]);
        let provider = BufferProvider::new(Arc::new(buffers));
        let root = provider.root(None);

        let seeds = provider
            .load_children(NodeSnapshot::from(&root), LoadContext::default())
            .await
            .expect("load should succeed");

        let bufnrs: Vec<&NodeUid> = seeds.iter().map(|seed| &seed.uid).collect();
        assert_eq!(bufnrs, vec![
            &BufferProvider::uid(2),
            &BufferProvider::uid(7)
        ]);
        assert!(seeds.iter().all(|seed| !seed.expandable));
    }
}
