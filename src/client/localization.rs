//! User-facing strings of the todos pages.

use serde::{Deserialize, Serialize};

/// Every string the pages and notifications show.
///
/// Hosts override a subset with struct update syntax, or by deserializing a
/// partial table: missing keys fall back to the defaults.
///
/// ```
/// use todo_plugin::client::localization::TodosLocalization;
///
/// let strings: TodosLocalization =
///     serde_json::from_str(r#"{"TODOS_LIST_TITLE": "Tasks"}"#).unwrap();
/// assert_eq!(strings.todos_list_title, "Tasks");
/// assert_eq!(strings.todos_delete, "Delete");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "SCREAMING_SNAKE_CASE")]
pub struct TodosLocalization {
    pub todos_list_title: String,
    pub todos_list_description: String,
    pub todos_add_title: String,
    pub todos_add_description: String,

    pub todos_empty_title: String,
    pub todos_empty_description: String,
    pub todos_add_link: String,
    pub todos_add_button: String,

    pub todos_form_title_label: String,
    pub todos_form_title_placeholder: String,
    pub todos_form_save: String,
    pub todos_form_saving: String,
    pub todos_form_cancel: String,

    pub todos_delete: String,
    pub todos_toggle_success: String,
    pub todos_toggle_error: String,
    pub todos_delete_success: String,
    pub todos_delete_error: String,
    pub todos_add_success: String,
    pub todos_add_error: String,

    pub todos_error_title: String,
    pub todos_error_try_again: String,
    pub todos_not_found_title: String,
    pub todos_not_found_description: String,
    pub todos_not_found_back: String,
}

impl Default for TodosLocalization {
    fn default() -> Self {
        Self {
            todos_list_title: "Todos".into(),
            todos_list_description: "Manage your tasks".into(),
            todos_add_title: "Add Todo".into(),
            todos_add_description: "Create a new todo item".into(),

            todos_empty_title: "No Todos".into(),
            todos_empty_description: "No todos found".into(),
            todos_add_link: "Add a todo".into(),
            todos_add_button: "Add Todo".into(),

            todos_form_title_label: "Title".into(),
            todos_form_title_placeholder: "Buy groceries".into(),
            todos_form_save: "Save".into(),
            todos_form_saving: "Saving...".into(),
            todos_form_cancel: "Cancel".into(),

            todos_delete: "Delete".into(),
            todos_toggle_success: "Todo has been toggled".into(),
            todos_toggle_error: "Error toggling todo".into(),
            todos_delete_success: "Todo has been deleted".into(),
            todos_delete_error: "Error deleting todo".into(),
            todos_add_success: "Todo has been added".into(),
            todos_add_error: "Error adding todo".into(),

            todos_error_title: "Something went wrong".into(),
            todos_error_try_again: "Try again".into(),
            todos_not_found_title: "Page Not Found".into(),
            todos_not_found_description: "The page you're looking for doesn't exist".into(),
            todos_not_found_back: "Go back to Todos".into(),
        }
    }
}
