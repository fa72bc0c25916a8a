//! Scope chain shared by the semantic analyzer and the IR builder.
//!
//! Frames live in one stack. Each frame links to its enclosing frame by index,
//! so outward lookup never needs ownership or reference cycles.
//! Frames are pushed when entering a function body or a conditional block and popped on the way out.

use rustc_hash::FxHashMap;

#[derive(Debug)]
pub struct Frame<T> {
    symbols: FxHashMap<String, T>,
    parent: Option<usize>,
}

#[derive(Debug)]
pub struct ScopeStack<T> {
    frames: Vec<Frame<T>>,
}

impl<T> ScopeStack<T> {
    /// Starts with a single root frame that is never popped
    pub fn new() -> Self {
        ScopeStack {
            frames: vec![Frame {
                symbols: FxHashMap::default(),
                parent: None,
            }],
        }
    }

    pub fn push_frame(&mut self) {
        let parent = self.frames.len() - 1;
        self.frames.push(Frame {
            symbols: FxHashMap::default(),
            parent: Some(parent),
        });
    }

    pub fn pop_frame(&mut self) {
        if self.frames.len() > 1 {
            self.frames.pop();
        }
    }

    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    /// Adds the name to the innermost frame.
    /// Returns false and leaves the existing entry alone if that frame already has the name.
    pub fn declare(&mut self, name: &str, value: T) -> bool {
        let frame = self.innermost_mut();
        if frame.symbols.contains_key(name) {
            return false;
        }

        frame.symbols.insert(name.to_owned(), value);
        true
    }

    /// Adds or replaces the name in the innermost frame
    pub fn redeclare(&mut self, name: &str, value: T) {
        self.innermost_mut().symbols.insert(name.to_owned(), value);
    }

    pub fn lookup(&self, name: &str) -> Option<&T> {
        let mut index = Some(self.frames.len() - 1);

        while let Some(i) = index {
            let frame = &self.frames[i];
            if let Some(value) = frame.symbols.get(name) {
                return Some(value);
            }
            index = frame.parent;
        }

        None
    }

    pub fn lookup_mut(&mut self, name: &str) -> Option<&mut T> {
        let mut index = Some(self.frames.len() - 1);

        // Find the owning frame first so the mutable borrow is taken once
        while let Some(i) = index {
            if self.frames[i].symbols.contains_key(name) {
                return self.frames[i].symbols.get_mut(name);
            }
            index = self.frames[i].parent;
        }

        None
    }

    fn innermost_mut(&mut self) -> &mut Frame<T> {
        let last = self.frames.len() - 1;
        &mut self.frames[last]
    }
}

impl<T> Default for ScopeStack<T> {
    fn default() -> Self {
        ScopeStack::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_walks_outwards_through_parents() {
        let mut scopes = ScopeStack::new();
        scopes.declare("outer", 1);
        scopes.push_frame();
        scopes.declare("inner", 2);

        assert_eq!(scopes.lookup("outer"), Some(&1));
        assert_eq!(scopes.lookup("inner"), Some(&2));

        scopes.pop_frame();
        assert_eq!(scopes.lookup("inner"), None);
    }

    #[test]
    fn inner_frames_shadow_outer_names() {
        let mut scopes = ScopeStack::new();
        scopes.declare("x", "outer");
        scopes.push_frame();
        assert!(scopes.declare("x", "inner"));
        assert_eq!(scopes.lookup("x"), Some(&"inner"));

        scopes.pop_frame();
        assert_eq!(scopes.lookup("x"), Some(&"outer"));
    }

    #[test]
    fn declare_refuses_a_name_already_in_the_same_frame() {
        let mut scopes = ScopeStack::new();
        assert!(scopes.declare("x", 1));
        assert!(!scopes.declare("x", 2));
        assert_eq!(scopes.lookup("x"), Some(&1));

        scopes.redeclare("x", 3);
        assert_eq!(scopes.lookup("x"), Some(&3));
    }

    #[test]
    fn lookup_mut_updates_the_owning_frame() {
        let mut scopes = ScopeStack::new();
        scopes.declare("x", false);
        scopes.push_frame();

        if let Some(flag) = scopes.lookup_mut("x") {
            *flag = true;
        }

        scopes.pop_frame();
        assert_eq!(scopes.lookup("x"), Some(&true));
    }

    #[test]
    fn root_frame_is_never_popped() {
        let mut scopes: ScopeStack<i32> = ScopeStack::new();
        scopes.pop_frame();
        scopes.pop_frame();
        assert_eq!(scopes.depth(), 1);
        scopes.declare("x", 1);
        assert_eq!(scopes.lookup("x"), Some(&1));
    }
}
