//! HTTP handlers and route configuration.

mod admin;
mod auth;
mod blog;
mod health;

use actix_web::web;

use crate::middleware::error::method_not_allowed;

/// Configure all application routes.
pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/blog")
            .route("", web::get().to(blog::post_list))
            .route("/search", web::get().to(blog::post_search))
            .route("/sidebar", web::get().to(blog::sidebar))
            .route("/tag/{tag_slug}", web::get().to(blog::post_list_by_tag))
            .route(
                "/{year}/{month}/{day}/{slug}",
                web::get().to(blog::post_detail),
            )
            .service(
                web::resource("/{post_id}/share")
                    .route(web::get().to(blog::share_form))
                    .route(web::post().to(blog::share_post))
                    .default_service(web::to(method_not_allowed)),
            )
            .service(
                web::resource("/{post_id}/comment")
                    .route(web::post().to(blog::post_comment))
                    .default_service(web::to(method_not_allowed)),
            ),
    )
    .service(
        web::scope("/api")
            // Public routes
            .route("/health", web::get().to(health::health_check))
            // Auth routes
            .service(
                web::scope("/auth")
                    .route("/login", web::post().to(auth::login))
                    .route("/me", web::get().to(auth::me)),
            )
            // Editorial routes (staff only)
            .service(
                web::scope("/admin")
                    .service(
                        web::resource("/posts")
                            .route(web::get().to(admin::list_posts))
                            .route(web::post().to(admin::create_post)),
                    )
                    .service(
                        web::resource("/posts/{id}")
                            .route(web::get().to(admin::get_post))
                            .route(web::patch().to(admin::update_post))
                            .route(web::delete().to(admin::delete_post)),
                    )
                    .route("/comments", web::get().to(admin::list_comments))
                    .route("/comments/{id}", web::patch().to(admin::moderate_comment)),
            ),
    );
}

#[cfg(test)]
mod tests;
