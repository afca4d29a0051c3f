use crate::models::{Document, Task, Timestamp};
use crate::sorting::{visible_tasks, SortType, View};

/// The UI's working copy of the document plus its view settings. Built from
/// one read of the server document and replaced wholesale on reload.
#[derive(Debug, Clone)]
pub struct Session {
    doc: Document,
    sort: SortType,
    pin_high_priority: bool,
    selected: Option<Timestamp>,
}

impl Session {
    pub fn new(doc: Document) -> Self {
        Self {
            doc,
            sort: SortType::default(),
            pin_high_priority: true,
            selected: None,
        }
    }

    pub fn document(&self) -> &Document {
        &self.doc
    }

    /// Copy of the document stamped with `now`, ready to be pushed back.
    pub fn to_document(&self, now: Timestamp) -> Document {
        let mut doc = self.doc.clone();
        doc.last_modified = Some(now);
        doc
    }

    pub fn sort(&self) -> SortType {
        self.sort
    }

    pub fn set_sort(&mut self, sort: SortType) {
        self.sort = sort;
    }

    pub fn pin_high_priority(&self) -> bool {
        self.pin_high_priority
    }

    pub fn set_pin_high_priority(&mut self, pin: bool) {
        self.pin_high_priority = pin;
    }

    pub fn visible(&self, view: View) -> Vec<&Task> {
        visible_tasks(&self.doc, view, self.sort, self.pin_high_priority)
    }

    pub fn category_glyph(&self, category: &str) -> &str {
        self.doc.glyph(category)
    }

    pub fn selected(&self) -> Option<&Task> {
        self.selected.and_then(|id| self.doc.task(id))
    }

    pub fn select(&mut self, id: Timestamp) -> bool {
        if self.doc.task(id).is_none() {
            return false;
        }
        self.selected = Some(id);
        true
    }

    pub fn clear_selection(&mut self) {
        self.selected = None;
    }

    /// Adds a default task keyed by `now`, selects it, and switches to
    /// newest-first so it shows at the top.
    pub fn new_task(&mut self, now: Timestamp) -> Timestamp {
        let mut id = now;
        while self.doc.task(id).is_some() {
            id += 1;
        }
        self.doc.insert_task(Task::new(id));
        self.selected = Some(id);
        self.sort = SortType::NewestFirst;
        id
    }

    /// Applies `edit` to the task in place. The id is restored afterwards.
    pub fn edit<F>(&mut self, id: Timestamp, edit: F) -> bool
    where
        F: FnOnce(&mut Task),
    {
        match self.doc.task_mut(id) {
            Some(task) => {
                edit(task);
                task.id = id;
                true
            }
            None => false,
        }
    }

    /// Marks an active task completed. Returns false for unknown or already
    /// completed tasks.
    pub fn complete(&mut self, id: Timestamp, now: Timestamp) -> bool {
        let Some(task) = self.doc.task_mut(id) else {
            return false;
        };
        if task.completion_time.is_some() {
            return false;
        }
        task.completion_time = Some(now);
        if self.selected == Some(id) {
            self.selected = None;
        }
        true
    }

    pub fn restore(&mut self, id: Timestamp) -> bool {
        match self.doc.task_mut(id) {
            Some(task) if task.completion_time.is_some() => {
                task.completion_time = None;
                true
            }
            _ => false,
        }
    }

    pub fn delete(&mut self, id: Timestamp) -> Option<Task> {
        if self.selected == Some(id) {
            self.selected = None;
        }
        self.doc.remove_task(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_session() -> Session {
        let mut doc = Document::seed();
        doc.categories.insert("work".to_string(), "💼".to_string());
        let mut a = Task::new(100);
        a.due_time = Some(5_000);
        let mut b = Task::new(200);
        b.priority = 1;
        let mut done = Task::new(50);
        done.completion_time = Some(10);
        doc.insert_task(a);
        doc.insert_task(b);
        doc.insert_task(done);
        Session::new(doc)
    }

    fn ids(tasks: Vec<&Task>) -> Vec<Timestamp> {
        tasks.into_iter().map(|task| task.id).collect()
    }

    #[test]
    fn new_session_uses_due_soonest_with_pin() {
        let session = make_session();
        assert_eq!(session.sort(), SortType::DueSoonest);
        assert!(session.pin_high_priority());
        assert!(session.selected().is_none());
        assert_eq!(ids(session.visible(View::Active)), vec![200, 100]);
        assert_eq!(ids(session.visible(View::Completed)), vec![50]);
    }

    #[test]
    fn sort_and_pin_settings_change_visible_order() {
        let mut session = make_session();
        session.set_pin_high_priority(false);
        assert_eq!(ids(session.visible(View::Active)), vec![100, 200]);
        session.set_sort(SortType::NewestFirst);
        assert_eq!(ids(session.visible(View::Active)), vec![200, 100]);
    }

    #[test]
    fn new_task_is_selected_and_sorted_newest_first() {
        let mut session = make_session();
        session.set_pin_high_priority(false);
        let id = session.new_task(1_000);
        assert_eq!(id, 1_000);
        assert_eq!(session.sort(), SortType::NewestFirst);
        let selected = session.selected().expect("new task selected");
        assert_eq!(selected.name, "New thing");
        assert_eq!(selected.category, "idk");
        assert!(selected.is_active());
        assert_eq!(session.visible(View::Active)[0].id, 1_000);
    }

    #[test]
    fn new_task_never_reuses_an_existing_id() {
        let mut session = make_session();
        assert_eq!(session.new_task(100), 101);
        assert_eq!(session.new_task(100), 102);
        assert_eq!(session.document().tasks.len(), 5);
    }

    #[test]
    fn edit_updates_fields_but_not_id() {
        let mut session = make_session();
        assert!(session.edit(100, |task| {
            task.name = "write report".to_string();
            task.category = "work".to_string();
            task.due_time = None;
            task.days_to_resurrect = 3;
            task.id = 999;
        }));
        let task = session.document().task(100).expect("still keyed by 100");
        assert_eq!(task.id, 100);
        assert_eq!(task.name, "write report");
        assert_eq!(task.days_to_resurrect, 3);
        assert_eq!(session.category_glyph(&task.category), "💼");
        assert!(!session.edit(12345, |_| {}));
    }

    #[test]
    fn complete_and_restore_follow_lifecycle() {
        let mut session = make_session();
        assert!(session.select(100));
        assert!(session.complete(100, 7_000));
        assert!(session.selected().is_none());
        assert_eq!(session.document().task(100).unwrap().completion_time, Some(7_000));
        assert!(!session.complete(100, 8_000));
        assert_eq!(session.document().task(100).unwrap().completion_time, Some(7_000));
        assert_eq!(ids(session.visible(View::Completed)), vec![100, 50]);

        assert!(session.restore(100));
        assert!(session.document().task(100).unwrap().is_active());
        assert!(!session.restore(100));
        assert!(!session.complete(404, 1));
    }

    #[test]
    fn delete_removes_task_and_selection() {
        let mut session = make_session();
        assert!(session.select(50));
        let removed = session.delete(50).expect("task existed");
        assert_eq!(removed.id, 50);
        assert!(session.selected().is_none());
        assert!(session.delete(50).is_none());
        assert!(!session.select(50));
    }

    #[test]
    fn to_document_stamps_last_modified_only() {
        let session = make_session();
        let doc = session.to_document(42);
        assert_eq!(doc.last_modified, Some(42));
        assert_eq!(doc.tasks, session.document().tasks);
        assert_eq!(doc.categories, session.document().categories);
    }
}
