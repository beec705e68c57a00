//! Intrusive Node Store: block-allocated free list
//!
//! Prinsip desain:
//! - Node hanya dialokasikan per block (B node sekaligus), tidak pernah satu-satu
//! - Semua ring (free list dan active ring milik caller) adalah circular
//!   doubly linked list dengan root sentinel
//! - Link berupa index ke arena, bukan raw pointer: splice/detach tetap O(1)
//! - `NodeId` membawa generation, jadi id yang sudah di-free tidak bisa
//!   dipakai untuk mengakses node yang sudah di-reuse

/// Jumlah block maksimum default
pub const DEFAULT_MAX_BLOCKS: usize = 8;

const FREE_RING: usize = 0;

/// Handle ke node yang sedang dipakai
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId {
    index: usize,
    generation: u32,
}

/// Handle ke active ring (root sentinel) di dalam store
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RingId(usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Link {
    Root(usize),
    Node(usize),
}

#[derive(Debug, Clone, Copy)]
struct Links {
    prev: Link,
    next: Link,
}

impl Links {
    const fn root(ring: usize) -> Self {
        Self {
            prev: Link::Root(ring),
            next: Link::Root(ring),
        }
    }
}

#[derive(Debug)]
struct Node<T> {
    links: Links,
    generation: u32,
    // None = node ada di free ring
    value: Option<T>,
}

/// Pool node dengan free list internal
///
/// Tidak thread-safe: hanya boleh dimutasi oleh satu thread pemilik.
#[derive(Debug)]
pub struct IntrusiveNodeStore<T> {
    blocks: Vec<Box<[Node<T>]>>,
    // roots[0] = free ring, sisanya active ring milik caller
    roots: Vec<Links>,
    block_size: usize,
    max_blocks: usize,
    num_free: usize,
}

impl<T> IntrusiveNodeStore<T> {
    /// Membuat store dengan block size tertentu dan block pertama sudah teralokasi.
    ///
    /// # Panics
    /// Panic jika `block_size == 0` atau `max_blocks == 0`
    pub fn new(block_size: usize, max_blocks: usize) -> Self {
        assert!(block_size > 0, "block_size must be > 0");
        assert!(max_blocks > 0, "max_blocks must be > 0");

        let mut store = Self {
            blocks: Vec::with_capacity(max_blocks),
            roots: vec![Links::root(FREE_RING)],
            block_size,
            max_blocks,
            num_free: 0,
        };
        store.grow();
        store
    }

    /// Store dengan [`DEFAULT_MAX_BLOCKS`]
    pub fn with_block_size(block_size: usize) -> Self {
        Self::new(block_size, DEFAULT_MAX_BLOCKS)
    }

    /// Membuat active ring kosong baru
    pub fn create_ring(&mut self) -> RingId {
        let ring = self.roots.len();
        self.roots.push(Links::root(ring));
        RingId(ring)
    }

    /// Ambil node dari free list dan sambungkan ke `ring` tepat sebelum root-nya
    ///
    /// Returns `None` jika free list kosong dan jumlah block sudah maksimum.
    pub fn allocate(&mut self, ring: RingId, value: T) -> Option<NodeId> {
        debug_assert!(ring.0 != FREE_RING && ring.0 < self.roots.len(), "unknown ring");

        if self.num_free == 0 && !self.grow() {
            return None;
        }

        let index = match self.roots[FREE_RING].next {
            Link::Node(index) => index,
            Link::Root(_) => return None,
        };

        self.detach(Link::Node(index));
        self.attach_before(Link::Node(index), Link::Root(ring.0));
        self.num_free -= 1;

        let node = self.node_mut(index);
        node.value = Some(value);
        Some(NodeId {
            index,
            generation: node.generation,
        })
    }

    /// Kembalikan node ke ekor free list dan kosongkan payload-nya
    ///
    /// Returns payload yang dilepas, atau `None` jika id sudah stale.
    pub fn free(&mut self, id: NodeId) -> Option<T> {
        if !self.is_live(id) {
            return None;
        }

        self.detach(Link::Node(id.index));
        self.attach_before(Link::Node(id.index), Link::Root(FREE_RING));
        self.num_free += 1;

        let node = self.node_mut(id.index);
        node.generation = node.generation.wrapping_add(1);
        node.value.take()
    }

    /// Paksa semua node dari semua block kembali ke free list.
    ///
    /// Semua active ring menjadi kosong. Hanya untuk teardown.
    pub fn reset(&mut self) {
        for (ring, root) in self.roots.iter_mut().enumerate() {
            *root = Links::root(ring);
        }

        for block in 0..self.blocks.len() {
            for offset in 0..self.block_size {
                let index = block * self.block_size + offset;
                let node = self.node_mut(index);
                if node.value.take().is_some() {
                    node.generation = node.generation.wrapping_add(1);
                }
                self.attach_before(Link::Node(index), Link::Root(FREE_RING));
            }
        }

        self.num_free = self.capacity();
        tracing::debug!(capacity = self.num_free, "Node store reset");
    }

    /// Coba alokasikan satu block node lagi
    ///
    /// Returns `false` jika sudah mencapai `max_blocks`.
    pub fn grow(&mut self) -> bool {
        if self.blocks.len() >= self.max_blocks {
            if cfg!(debug_assertions) {
                tracing::warn!(
                    max_blocks = self.max_blocks,
                    block_size = self.block_size,
                    "Cannot allocate any more nodes"
                );
            }
            return false;
        }

        let block_idx = self.blocks.len();
        let placeholder = Links::root(FREE_RING);
        let block: Box<[Node<T>]> = (0..self.block_size)
            .map(|_| Node {
                links: placeholder,
                generation: 0,
                value: None,
            })
            .collect();
        self.blocks.push(block);

        for offset in 0..self.block_size {
            self.attach_before(
                Link::Node(block_idx * self.block_size + offset),
                Link::Root(FREE_RING),
            );
        }
        self.num_free += self.block_size;

        tracing::trace!(block = block_idx, block_size = self.block_size, "Node block allocated");
        true
    }

    /// Node pertama di ring (dalam urutan insert)
    #[inline]
    pub fn head(&self, ring: RingId) -> Option<NodeId> {
        self.id_at(self.roots[ring.0].next)
    }

    /// Node setelah `id` di ring yang sama, `None` jika sudah sampai root.
    ///
    /// Ambil `next` SEBELUM mem-free node saat ini untuk traversal yang menghapus.
    #[inline]
    pub fn next(&self, id: NodeId) -> Option<NodeId> {
        if !self.is_live(id) {
            return None;
        }
        self.id_at(self.node(id.index).links.next)
    }

    #[inline]
    pub fn get(&self, id: NodeId) -> Option<&T> {
        if !self.is_live(id) {
            return None;
        }
        self.node(id.index).value.as_ref()
    }

    #[inline]
    pub fn get_mut(&mut self, id: NodeId) -> Option<&mut T> {
        if !self.is_live(id) {
            return None;
        }
        self.node_mut(id.index).value.as_mut()
    }

    /// Iterator atas payload di ring, urutan insert
    pub fn iter(&self, ring: RingId) -> RingIter<'_, T> {
        RingIter {
            store: self,
            cursor: self.roots[ring.0].next,
        }
    }

    /// Jumlah node di ring (walk)
    pub fn ring_len(&self, ring: RingId) -> usize {
        self.iter(ring).count()
    }

    #[inline(always)]
    pub fn is_ring_empty(&self, ring: RingId) -> bool {
        matches!(self.roots[ring.0].next, Link::Root(_))
    }

    /// Jumlah node di free list
    #[inline(always)]
    pub fn num_free(&self) -> usize {
        self.num_free
    }

    /// Jumlah node yang sedang terpasang di active ring
    #[inline(always)]
    pub fn num_in_use(&self) -> usize {
        self.capacity() - self.num_free
    }

    /// Total node di semua block yang sudah dialokasikan
    #[inline(always)]
    pub fn capacity(&self) -> usize {
        self.blocks.len() * self.block_size
    }

    #[inline(always)]
    pub fn num_blocks(&self) -> usize {
        self.blocks.len()
    }

    #[inline(always)]
    pub fn block_size(&self) -> usize {
        self.block_size
    }

    /// Hitung node yang reachable dari free ring (walk, untuk verifikasi)
    pub fn count_free_ring(&self) -> usize {
        let mut count = 0;
        let mut cursor = self.roots[FREE_RING].next;
        while let Link::Node(index) = cursor {
            count += 1;
            cursor = self.node(index).links.next;
        }
        count
    }

    #[inline(always)]
    fn is_live(&self, id: NodeId) -> bool {
        id.index < self.capacity() && {
            let node = self.node(id.index);
            node.generation == id.generation && node.value.is_some()
        }
    }

    #[inline(always)]
    fn id_at(&self, link: Link) -> Option<NodeId> {
        match link {
            Link::Node(index) => Some(NodeId {
                index,
                generation: self.node(index).generation,
            }),
            Link::Root(_) => None,
        }
    }

    #[inline(always)]
    fn node(&self, index: usize) -> &Node<T> {
        &self.blocks[index / self.block_size][index % self.block_size]
    }

    #[inline(always)]
    fn node_mut(&mut self, index: usize) -> &mut Node<T> {
        &mut self.blocks[index / self.block_size][index % self.block_size]
    }

    #[inline(always)]
    fn links(&self, at: Link) -> Links {
        match at {
            Link::Root(ring) => self.roots[ring],
            Link::Node(index) => self.node(index).links,
        }
    }

    #[inline(always)]
    fn links_mut(&mut self, at: Link) -> &mut Links {
        match at {
            Link::Root(ring) => &mut self.roots[ring],
            Link::Node(index) => &mut self.node_mut(index).links,
        }
    }

    #[inline(always)]
    fn detach(&mut self, at: Link) {
        let Links { prev, next } = self.links(at);
        self.links_mut(next).prev = prev;
        self.links_mut(prev).next = next;
    }

    #[inline(always)]
    fn attach_before(&mut self, at: Link, root: Link) {
        let tail = self.links(root).prev;
        self.links_mut(tail).next = at;
        *self.links_mut(at) = Links {
            prev: tail,
            next: root,
        };
        self.links_mut(root).prev = at;
    }
}

/// Iterator atas ring, yield `(NodeId, &T)`
pub struct RingIter<'a, T> {
    store: &'a IntrusiveNodeStore<T>,
    cursor: Link,
}

impl<'a, T> Iterator for RingIter<'a, T> {
    type Item = (NodeId, &'a T);

    fn next(&mut self) -> Option<Self::Item> {
        let Link::Node(index) = self.cursor else {
            return None;
        };
        let node = self.store.node(index);
        self.cursor = node.links.next;
        let id = NodeId {
            index,
            generation: node.generation,
        };
        node.value.as_ref().map(|v| (id, v))
    }
}
