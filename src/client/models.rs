//! # Aruba Central 接口数据模型

use serde::{Deserialize, Serialize};

/// 分页列表响应（users/roles）
#[derive(Debug, Clone, Deserialize)]
pub struct ListResponse<T> {
    #[serde(default = "Vec::new")]
    pub items: Vec<T>,
    #[serde(default)]
    pub total: u32,
}

/// 分组列表响应：`data` 是按配置分组嵌套的名字列表
#[derive(Debug, Clone, Deserialize)]
pub struct GroupListResponse {
    #[serde(default)]
    pub data: Vec<Vec<String>>,
    #[serde(default)]
    pub total: u32,
}

impl GroupListResponse {
    /// 展开一层嵌套
    #[must_use]
    pub fn flatten(self) -> Vec<String> {
        self.data.into_iter().flatten().collect()
    }
}

/// 上游错误响应体
#[derive(Debug, Clone, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    #[serde(rename = "status_code", default)]
    pub code: i64,
}

impl ErrorResponse {
    #[must_use]
    pub fn message(&self) -> String {
        format!("error: {}, status code: {}", self.error, self.code)
    }
}

/// 用户姓名
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserName {
    #[serde(rename = "firstname", default)]
    pub first: String,
    #[serde(rename = "lastname", default)]
    pub last: String,
}

/// 用户在某个应用下的作用域
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Scope {
    #[serde(default)]
    pub groups: Vec<String>,
}

/// 用户在某个应用下的角色与作用域
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApplicationRole {
    #[serde(default)]
    pub role: String,
    #[serde(default)]
    pub scope: Scope,
}

/// 用户的应用授权
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserApplication {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub info: Vec<ApplicationRole>,
}

/// 用户
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub username: String,
    #[serde(default)]
    pub name: UserName,
    #[serde(default)]
    pub applications: Vec<UserApplication>,
}

impl User {
    /// 用户是否属于某个分组
    ///
    /// 分组成员关系只能从各应用的作用域分组推导，上游没有分组成员接口。
    #[must_use]
    pub fn contains_group(&self, group: &str) -> bool {
        self.applications
            .iter()
            .flat_map(|app| app.info.iter())
            .any(|info| info.scope.groups.iter().any(|g| g == group))
    }

    /// 显示名："名 姓"
    #[must_use]
    pub fn full_name(&self) -> String {
        format!("{} {}", self.name.first, self.name.last)
            .trim()
            .to_string()
    }
}

/// 角色下某应用模块的权限
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Module {
    #[serde(rename = "module_name")]
    pub name: String,
    #[serde(default)]
    pub permission: String,
}

/// 角色下的应用权限
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Application {
    #[serde(rename = "appname")]
    pub name: String,
    #[serde(default)]
    pub permission: String,
    #[serde(default)]
    pub modules: Vec<Module>,
}

impl Application {
    /// 应用级权限的权益名 `{app}-{permission}`
    #[must_use]
    pub fn entitlement_slug(&self) -> String {
        format!("{}-{}", self.name, self.permission)
    }

    /// 模块级权限的权益名 `{app}-{permission}-{module}`
    #[must_use]
    pub fn module_entitlement_slug(&self, module: &Module) -> String {
        format!("{}-{}", self.entitlement_slug(), module.name)
    }
}

/// 角色成员：不同接口版本返回纯用户名或对象
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RoleMember {
    Username(String),
    Detailed { username: String },
}

impl RoleMember {
    #[must_use]
    pub fn username(&self) -> &str {
        match self {
            Self::Username(name) | Self::Detailed { username: name } => name,
        }
    }
}

impl From<&str> for RoleMember {
    fn from(value: &str) -> Self {
        Self::Username(value.to_string())
    }
}

/// 角色
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Role {
    #[serde(rename = "rolename")]
    pub name: String,
    #[serde(default)]
    pub users: Vec<RoleMember>,
    #[serde(rename = "no_of_users", default)]
    pub user_count: u32,
    #[serde(default)]
    pub permission: String,
    #[serde(default)]
    pub applications: Vec<Application>,
}

impl Role {
    pub fn usernames(&self) -> impl Iterator<Item = &str> {
        self.users.iter().map(RoleMember::username)
    }
}
