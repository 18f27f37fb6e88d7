use std::collections::HashMap;

use uuid::Uuid;

use crate::domain::{Drawing, Geometry};

/// Committed drawings: an arena keyed by id plus an insertion-order index.
/// Insertion order is z-order for rendering and the order `undo` walks
/// backward through. Keeping the two structures separate keeps `edit` and
/// `delete` O(1) while `undo` stays a stack pop.
#[derive(Default)]
pub struct AnnotationStore {
    entries: HashMap<Uuid, Drawing>,
    order: Vec<Uuid>,
}

impl AnnotationStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, drawing: Drawing) {
        self.order.push(drawing.id);
        self.entries.insert(drawing.id, drawing);
    }

    /// Replaces only the targeted drawing's geometry. Every other entry is
    /// left untouched.
    pub fn edit(&mut self, id: Uuid, geometry: Geometry) -> bool {
        match self.entries.get_mut(&id) {
            Some(drawing) => {
                drawing.geometry = geometry;
                true
            }
            None => false,
        }
    }

    pub fn delete(&mut self, id: Uuid) -> bool {
        if self.entries.remove(&id).is_some() {
            self.order.retain(|&entry| entry != id);
            true
        } else {
            false
        }
    }

    /// Removes the most recently added drawing.
    pub fn undo(&mut self) -> Option<Drawing> {
        let id = self.order.pop()?;
        self.entries.remove(&id)
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.order.clear();
    }

    pub fn get(&self, id: Uuid) -> Option<&Drawing> {
        self.entries.get(&id)
    }

    /// Drawings in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &Drawing> {
        self.order.iter().filter_map(|id| self.entries.get(id))
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{ChartPoint, DrawingKind};

    fn level(price: f64) -> Drawing {
        Drawing::level(DrawingKind::Horizontal, price)
    }

    #[test]
    fn undo_pops_back_to_the_previous_list() {
        let mut store = AnnotationStore::new();
        let drawings: Vec<Drawing> = (0..4).map(|i| level(100.0 + i as f64)).collect();
        for d in &drawings {
            store.add(d.clone());
        }

        store.undo();

        let remaining: Vec<Uuid> = store.iter().map(|d| d.id).collect();
        let expected: Vec<Uuid> = drawings[..3].iter().map(|d| d.id).collect();
        assert_eq!(remaining, expected, "same first N-1 drawings, same order");

        store.undo();
        store.undo();
        store.undo();
        assert!(store.undo().is_none());
        assert!(store.is_empty());
    }

    #[test]
    fn edit_touches_only_the_target() {
        let mut store = AnnotationStore::new();
        let a = level(100.0);
        let b = level(110.0);
        let c = Drawing::from_points(
            DrawingKind::TrendLine,
            vec![
                ChartPoint { time: 1, price: 1.0 },
                ChartPoint { time: 2, price: 2.0 },
            ],
        );
        let (a_id, b_id, c_id) = (a.id, b.id, c.id);
        let (a_before, c_before) = (a.clone(), c.clone());
        store.add(a);
        store.add(b);
        store.add(c);

        assert!(store.edit(b_id, Geometry::Level { price: 150.0 }));

        assert_eq!(store.get(a_id), Some(&a_before));
        assert_eq!(store.get(c_id), Some(&c_before));
        assert_eq!(
            store.get(b_id).unwrap().geometry,
            Geometry::Level { price: 150.0 }
        );
        // Insertion order unchanged by the edit.
        let order: Vec<Uuid> = store.iter().map(|d| d.id).collect();
        assert_eq!(order, vec![a_id, b_id, c_id]);
    }

    #[test]
    fn delete_by_id_and_clear() {
        let mut store = AnnotationStore::new();
        let a = level(100.0);
        let b = level(110.0);
        let a_id = a.id;
        store.add(a);
        store.add(b);

        assert!(store.delete(a_id));
        assert!(!store.delete(a_id), "double delete is a no-op");
        assert_eq!(store.len(), 1);

        store.clear();
        assert!(store.is_empty());
    }

    #[test]
    fn edit_of_unknown_id_reports_false() {
        let mut store = AnnotationStore::new();
        assert!(!store.edit(Uuid::new_v4(), Geometry::Level { price: 1.0 }));
    }
}
