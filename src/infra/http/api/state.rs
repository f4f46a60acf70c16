use std::sync::Arc;

use crate::application::todos::TodoRoutes;

#[derive(Clone)]
pub struct ApiState {
    pub todos: Arc<TodoRoutes>,
}
