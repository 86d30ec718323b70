//! Índice de recencia sobre un arena de nodos.
//!
//! Los nodos se enlazan por índice (no por puntero), de modo que promover,
//! insertar y desalojar son O(1) sin `unsafe` ni `Rc<RefCell<_>>`. Los huecos
//! liberados se reutilizan vía `free`.

#[derive(Debug, Clone)]
struct Node {
    key: String,
    prev: Option<usize>,
    next: Option<usize>,
}

/// Cabeza = más recientemente usado; cola = candidato a desalojo.
#[derive(Debug, Clone, Default)]
pub struct RecencyIndex {
    nodes: Vec<Option<Node>>,
    free: Vec<usize>,
    head: Option<usize>,
    tail: Option<usize>,
    len: usize,
}

impl RecencyIndex {
    pub fn new() -> Self { Self::default() }

    pub fn len(&self) -> usize { self.len }

    pub fn is_empty(&self) -> bool { self.len == 0 }

    /// Inserta `key` como la más reciente y devuelve su handle.
    pub fn push_front(&mut self, key: String) -> usize {
        let node = Node { key, prev: None, next: self.head };
        let idx = match self.free.pop() {
            Some(i) => {
                self.nodes[i] = Some(node);
                i
            }
            None => {
                self.nodes.push(Some(node));
                self.nodes.len() - 1
            }
        };
        if let Some(h) = self.head {
            if let Some(n) = self.nodes[h].as_mut() {
                n.prev = Some(idx);
            }
        }
        self.head = Some(idx);
        if self.tail.is_none() {
            self.tail = Some(idx);
        }
        self.len += 1;
        idx
    }

    /// Mueve el nodo al frente.
    pub fn touch(&mut self, idx: usize) {
        if self.head == Some(idx) {
            return;
        }
        if self.detach(idx).is_none() {
            return;
        }
        if let Some(n) = self.nodes[idx].as_mut() {
            n.prev = None;
            n.next = self.head;
        }
        if let Some(h) = self.head {
            if let Some(n) = self.nodes[h].as_mut() {
                n.prev = Some(idx);
            }
        }
        self.head = Some(idx);
        if self.tail.is_none() {
            self.tail = Some(idx);
        }
        self.len += 1;
    }

    pub fn remove(&mut self, idx: usize) -> Option<String> {
        self.detach(idx)?;
        let node = self.nodes.get_mut(idx)?.take()?;
        self.free.push(idx);
        Some(node.key)
    }

    /// Extrae la clave menos recientemente usada.
    pub fn pop_back(&mut self) -> Option<String> {
        let tail = self.tail?;
        self.remove(tail)
    }

    pub fn clear(&mut self) { *self = Self::default(); }

    /// Recorre de menos a más reciente.
    pub fn iter_lru(&self) -> impl Iterator<Item = &str> + '_ {
        let mut cursor = self.tail;
        std::iter::from_fn(move || {
            let idx = cursor?;
            let node = self.nodes.get(idx)?.as_ref()?;
            cursor = node.prev;
            Some(node.key.as_str())
        })
    }

    // desengancha el nodo de la lista sin liberar su hueco
    fn detach(&mut self, idx: usize) -> Option<()> {
        let (prev, next) = {
            let n = self.nodes.get(idx)?.as_ref()?;
            (n.prev, n.next)
        };
        match prev {
            Some(p) => {
                if let Some(n) = self.nodes[p].as_mut() {
                    n.next = next;
                }
            }
            None => self.head = next,
        }
        match next {
            Some(x) => {
                if let Some(n) = self.nodes[x].as_mut() {
                    n.prev = prev;
                }
            }
            None => self.tail = prev,
        }
        self.len -= 1;
        Some(())
    }
}
