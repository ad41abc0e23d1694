use actix_web::HttpResponse;
use serde::Serialize;

pub mod approval;
pub mod attendance;
pub mod employee;
pub mod increment;
pub mod leave;
pub mod md;
pub mod payroll;
pub mod promotion;
pub mod records;
pub mod tasks;

#[derive(Serialize)]
struct Envelope<T: Serialize> {
    success: bool,
    data: T,
}

/// `200 {"success": true, "data": ...}`
pub fn ok<T: Serialize>(data: T) -> HttpResponse {
    HttpResponse::Ok().json(Envelope { success: true, data })
}

pub fn created<T: Serialize>(data: T) -> HttpResponse {
    HttpResponse::Created().json(Envelope { success: true, data })
}

#[derive(Debug, Serialize)]
pub struct Page<T: Serialize> {
    pub items: Vec<T>,
    pub page: u32,
    pub per_page: u32,
    pub total: i64,
}

/// Returns `(page, per_page, offset)`; page is 1-based, per_page 1..=100.
pub fn paginate(page: Option<u32>, per_page: Option<u32>) -> (u32, u32, u32) {
    let page = page.unwrap_or(1).max(1);
    let per_page = per_page.unwrap_or(20).clamp(1, 100);
    (page, per_page, (page - 1).saturating_mul(per_page))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pagination_is_clamped() {
        assert_eq!(paginate(None, None), (1, 20, 0));
        assert_eq!(paginate(Some(0), Some(0)), (1, 1, 0));
        assert_eq!(paginate(Some(3), Some(500)), (3, 100, 200));
    }
}
