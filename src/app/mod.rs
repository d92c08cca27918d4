// ==========================================
// 农资供应管理系统 - 应用层
// ==========================================
// 职责: 装配后端/Store/API，并提供异步调用入口
// ==========================================

pub mod state;

pub use state::{open_backend, spawn_api_call, AppState};
