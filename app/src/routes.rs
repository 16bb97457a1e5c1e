use kit::Router;

use crate::controllers;

pub fn register() -> Router {
    Router::new()
        .get("/users/{id}", controllers::user::show)
        .post("/users", controllers::user::store)
        .put("/users/{id}", controllers::user::update)
        .patch("/users/{id}", controllers::user::update)
        .delete("/users/{id}", controllers::user::destroy)
        .put("/users/{id}/avatar", controllers::profile::avatar)
}
