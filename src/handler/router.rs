use crate::handler::responses::Page;

pub enum Route<'a> {
    Page(Page),
    /// Raw `<n>` segment of `/stream/<n>`, validated by the stream handler.
    Stream(&'a str),
}

pub fn route(target: &str) -> Route<'_> {
    match target {
        "/yourproblem" => Route::Page(Page::BadRequest),
        "/myproblem" => Route::Page(Page::InternalServerError),
        _ => match target.strip_prefix("/stream/") {
            Some(count) => Route::Stream(count),
            None => Route::Page(Page::Ok),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn routes_by_target() {
        assert!(matches!(route("/yourproblem"), Route::Page(Page::BadRequest)));
        assert!(matches!(route("/myproblem"), Route::Page(Page::InternalServerError)));
        assert!(matches!(route("/stream/12"), Route::Stream("12")));
        assert!(matches!(route("/"), Route::Page(Page::Ok)));
        assert!(matches!(route("/yourproblem/"), Route::Page(Page::Ok)));
    }
}
