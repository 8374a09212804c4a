use async_trait::async_trait;
use chrono::{DateTime, FixedOffset};
use uuid::Uuid;

use crate::{
    client::ClientResult,
    core::enums::PermissionAction,
    dtos::permission::{
        PermissionFlags, PermissionInput, PermissionMatrix, PermissionRow, SavePermissionsRequest,
    },
};

/// 权限矩阵的读写来源，[`crate::client::AdminClient`] 是网络实现
#[async_trait]
pub trait PermissionSource: Send + Sync {
    async fn fetch(&self, role_id: Uuid) -> ClientResult<PermissionMatrix>;
    async fn save(
        &self,
        role_id: Uuid,
        request: &SavePermissionsRequest,
    ) -> ClientResult<PermissionMatrix>;
}

/// 复选框网格：行是模块，列是 view / add / edit / delete / all。
///
/// 每次修改后都满足 `all == view && add && edit && delete`。
/// `snapshot` 保存最近一次加载或保存成功的服务端状态，供 [`PermissionGrid::reset`] 使用。
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PermissionGrid {
    role_name: String,
    updated_at: Option<DateTime<FixedOffset>>,
    rows: Vec<PermissionRow>,
    snapshot: Vec<PermissionRow>,
}

impl PermissionGrid {
    pub fn from_matrix(matrix: PermissionMatrix) -> Self {
        let rows: Vec<PermissionRow> = matrix
            .permissions
            .into_iter()
            .map(|row| PermissionRow { flags: row.flags.normalized(), ..row })
            .collect();
        Self {
            role_name: matrix.role_name,
            updated_at: Some(matrix.updated_at),
            snapshot: rows.clone(),
            rows,
        }
    }

    pub fn role_name(&self) -> &str {
        &self.role_name
    }

    pub fn rows(&self) -> &[PermissionRow] {
        &self.rows
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn flags(&self, module_id: i32) -> Option<PermissionFlags> {
        self.rows.iter().find(|r| r.module_id == module_id).map(|r| r.flags)
    }

    /// 本地是否有未保存的修改
    pub fn is_dirty(&self) -> bool {
        self.rows != self.snapshot
    }

    /// 切换 `all`：打开时四个子权限全部打开，关闭时全部清除。
    /// 模块不存在时返回 `None`。
    pub fn toggle_all(&mut self, module_id: i32) -> Option<PermissionFlags> {
        let row = self.row_mut(module_id)?;
        let value = !row.flags.all;
        row.flags.set_all(value);
        Some(row.flags)
    }

    /// 切换单个子权限并重新推导 `all`
    pub fn toggle(&mut self, module_id: i32, action: PermissionAction) -> Option<PermissionFlags> {
        let row = self.row_mut(module_id)?;
        let value = !row.flags.allows(action);
        row.flags.set(action, value);
        Some(row.flags)
    }

    /// 丢弃本地修改，恢复到最近一次的服务端快照
    pub fn reset(&mut self) {
        self.rows = self.snapshot.clone();
    }

    /// 整表保存请求，携带加载时的 `updated_at` 作为前置条件
    pub fn to_request(&self) -> SavePermissionsRequest {
        SavePermissionsRequest {
            permissions: self
                .rows
                .iter()
                .map(|r| PermissionInput { module_id: r.module_id, flags: r.flags })
                .collect(),
            expected_updated_at: self.updated_at,
        }
    }

    fn row_mut(&mut self, module_id: i32) -> Option<&mut PermissionRow> {
        self.rows.iter_mut().find(|r| r.module_id == module_id)
    }
}

/// 单个角色的权限编辑会话
pub struct PermissionEditor<S> {
    source: S,
    role_id: Uuid,
    grid: PermissionGrid,
    error: Option<String>,
}

impl<S: PermissionSource> PermissionEditor<S> {
    pub fn new(source: S, role_id: Uuid) -> Self {
        Self {
            source,
            role_id,
            grid: PermissionGrid::default(),
            error: None,
        }
    }

    pub fn grid(&self) -> &PermissionGrid {
        &self.grid
    }

    pub fn grid_mut(&mut self) -> &mut PermissionGrid {
        &mut self.grid
    }

    /// 最近一次加载或保存失败的消息
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// 加载失败时网格置空并记录错误
    pub async fn load(&mut self) -> ClientResult<()> {
        match self.source.fetch(self.role_id).await {
            Ok(matrix) => {
                self.grid = PermissionGrid::from_matrix(matrix);
                self.error = None;
                Ok(())
            }
            Err(e) => {
                tracing::warn!("⚠️ Failed to load permissions for role {}: {}", self.role_id, e);
                self.grid = PermissionGrid::default();
                self.error = Some(e.to_string());
                Err(e)
            }
        }
    }

    /// 保存失败时保留本地修改以便重试；成功后以服务端返回值作为新快照
    pub async fn save(&mut self) -> ClientResult<()> {
        let request = self.grid.to_request();
        match self.source.save(self.role_id, &request).await {
            Ok(matrix) => {
                self.grid = PermissionGrid::from_matrix(matrix);
                self.error = None;
                Ok(())
            }
            Err(e) => {
                tracing::warn!("⚠️ Failed to save permissions for role {}: {}", self.role_id, e);
                self.error = Some(e.to_string());
                Err(e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;
    use crate::client::ClientError;

    fn row(module_id: i32, module: &str, flags: PermissionFlags) -> PermissionRow {
        PermissionRow { module_id, module: module.to_string(), flags }
    }

    fn matrix(rows: Vec<PermissionRow>) -> PermissionMatrix {
        PermissionMatrix {
            role_id: Uuid::nil(),
            role_name: "Editor".to_string(),
            updated_at: crate::utils::now(),
            permissions: rows,
        }
    }

    fn grid() -> PermissionGrid {
        PermissionGrid::from_matrix(matrix(vec![
            row(1, "dashboard", PermissionFlags::default()),
            row(2, "products", PermissionFlags::new(true, true, true, false)),
        ]))
    }

    fn invariant_holds(grid: &PermissionGrid) -> bool {
        grid.rows()
            .iter()
            .all(|r| r.flags.all == (r.flags.view && r.flags.add && r.flags.edit && r.flags.delete))
    }

    #[test]
    fn toggling_all_sets_and_clears_every_flag() {
        let mut grid = grid();
        assert_eq!(grid.toggle_all(1), Some(PermissionFlags::full()));
        assert_eq!(grid.toggle_all(1), Some(PermissionFlags::default()));
        assert!(invariant_holds(&grid));
    }

    #[test]
    fn sub_flags_drive_the_all_flag() {
        let mut grid = grid();
        let flags = grid.toggle(2, PermissionAction::Delete).unwrap();
        assert!(flags.all);

        let flags = grid.toggle(2, PermissionAction::View).unwrap();
        assert!(!flags.all);
        assert!(flags.add && flags.edit && flags.delete);
        assert!(invariant_holds(&grid));
    }

    #[test]
    fn invariant_holds_after_every_toggle() {
        let mut grid = grid();
        let actions = [
            PermissionAction::View,
            PermissionAction::Add,
            PermissionAction::Edit,
            PermissionAction::Delete,
        ];
        for step in 0..32 {
            let module = if step % 3 == 0 { 1 } else { 2 };
            if step % 5 == 0 {
                grid.toggle_all(module);
            } else {
                grid.toggle(module, actions[step % actions.len()]);
            }
            assert!(invariant_holds(&grid), "broken after step {}", step);
        }
    }

    #[test]
    fn unknown_module_is_ignored() {
        let mut grid = grid();
        assert_eq!(grid.toggle(99, PermissionAction::View), None);
        assert!(!grid.is_dirty());
    }

    #[test]
    fn reset_restores_snapshot() {
        let mut grid = grid();
        grid.toggle_all(1);
        grid.toggle(2, PermissionAction::Add);
        assert!(grid.is_dirty());

        grid.reset();
        assert!(!grid.is_dirty());
        assert_eq!(grid.flags(1), Some(PermissionFlags::default()));
    }

    /// 内存来源：`fail` 为真时所有调用返回错误
    struct FakeSource {
        stored: Mutex<PermissionMatrix>,
        fail: bool,
    }

    #[async_trait]
    impl PermissionSource for FakeSource {
        async fn fetch(&self, _role_id: Uuid) -> ClientResult<PermissionMatrix> {
            if self.fail {
                return Err(ClientError::Server("connection refused".to_string()));
            }
            Ok(self.stored.lock().unwrap().clone())
        }

        async fn save(
            &self,
            _role_id: Uuid,
            request: &SavePermissionsRequest,
        ) -> ClientResult<PermissionMatrix> {
            if self.fail {
                return Err(ClientError::Conflict("stale".to_string()));
            }
            let mut stored = self.stored.lock().unwrap();
            for input in &request.permissions {
                let row = stored.permissions.iter_mut().find(|r| r.module_id == input.module_id);
                if let Some(row) = row {
                    row.flags = input.flags.normalized();
                }
            }
            Ok(stored.clone())
        }
    }

    fn source(fail: bool) -> FakeSource {
        FakeSource {
            stored: Mutex::new(matrix(vec![row(1, "dashboard", PermissionFlags::default())])),
            fail,
        }
    }

    #[tokio::test]
    async fn failed_load_leaves_grid_empty_with_error() {
        let mut editor = PermissionEditor::new(source(true), Uuid::nil());
        assert!(editor.load().await.is_err());
        assert!(editor.grid().is_empty());
        assert_eq!(editor.error(), Some("Server error: connection refused"));
    }

    #[tokio::test]
    async fn save_replaces_snapshot_with_server_answer() {
        let mut editor = PermissionEditor::new(source(false), Uuid::nil());
        editor.load().await.unwrap();
        editor.grid_mut().toggle_all(1);

        editor.save().await.unwrap();
        assert!(!editor.grid().is_dirty());
        assert_eq!(editor.grid().flags(1), Some(PermissionFlags::full()));
        assert_eq!(editor.error(), None);

        editor.load().await.unwrap();
        assert_eq!(editor.grid().flags(1), Some(PermissionFlags::full()));
    }

    #[tokio::test]
    async fn failed_save_keeps_local_edits() {
        let mut editor = PermissionEditor::new(source(false), Uuid::nil());
        editor.load().await.unwrap();
        editor.grid_mut().toggle(1, PermissionAction::View);

        editor.source.fail = true;
        assert!(editor.save().await.is_err());
        assert!(editor.grid().is_dirty());
        assert_eq!(editor.grid().flags(1), Some(PermissionFlags::new(true, false, false, false)));
        assert!(editor.error().is_some());
    }
}
