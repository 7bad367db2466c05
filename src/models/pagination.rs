//! 分页相关的数据结构

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Clone, Deserialize, Serialize, ToSchema)]
pub struct PaginationParams {
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}

impl PaginationParams {
    pub fn new(page: Option<u32>, per_page: Option<u32>) -> Self {
        Self { page, per_page }
    }

    pub fn get_page(&self) -> u32 {
        self.page.unwrap_or(1).max(1)
    }

    pub fn get_per_page(&self) -> u32 {
        self.per_page.unwrap_or(20).clamp(1, 100)
    }

    pub fn get_offset(&self) -> usize {
        ((self.get_page() - 1) * self.get_per_page()) as usize
    }
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct PaginatedResponse<T> {
    pub data: Vec<T>,
    pub page: u32,
    pub per_page: u32,
    pub total: usize,
    pub total_pages: u32,
}

impl<T> PaginatedResponse<T> {
    /// 数据库已按 limit/offset 取出当前页
    pub fn new(data: Vec<T>, params: &PaginationParams, total: u64) -> Self {
        let per_page = params.get_per_page();
        let total = total as usize;
        let total_pages = if total == 0 {
            1
        } else {
            total.div_ceil(per_page as usize) as u32
        };

        Self {
            data,
            page: params.get_page(),
            per_page,
            total,
            total_pages,
        }
    }

    /// 对已排序的内存结果切页
    pub fn paginate(items: Vec<T>, params: &PaginationParams) -> Self {
        let total = items.len() as u64;
        let data = items
            .into_iter()
            .skip(params.get_offset())
            .take(params.get_per_page() as usize)
            .collect();
        Self::new(data, params, total)
    }
}
