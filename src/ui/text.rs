//! Interface strings for each supported language.

use crate::model::Language;

pub struct Strings {
    pub app_title: &'static str,
    pub files: &'static str,
    pub sessions: &'static str,
    pub skills: &'static str,
    pub settings: &'static str,
    pub refresh: &'static str,
    pub new_file: &'static str,
    pub new_folder: &'static str,
    pub rename: &'static str,
    pub delete: &'static str,
    pub name_hint: &'static str,
    pub new_chat: &'static str,
    pub no_sessions: &'static str,
    pub search_skills: &'static str,
    pub all_categories: &'static str,
    pub skill_packs: &'static str,
    pub install_pack: &'static str,
    pub pack_path_hint: &'static str,
    pub uninstall: &'static str,
    pub create_skill: &'static str,
    pub description: &'static str,
    pub content: &'static str,
    pub save: &'static str,
    pub save_all: &'static str,
    pub close: &'static str,
    pub no_open_files: &'static str,
    pub chat: &'static str,
    pub you: &'static str,
    pub assistant: &'static str,
    pub message_hint: &'static str,
    pub send: &'static str,
    pub attach_active_file: &'static str,
    pub empty_chat: &'static str,
    pub provider: &'static str,
    pub api_key: &'static str,
    pub endpoint: &'static str,
    pub workspace: &'static str,
    pub browse: &'static str,
    pub font_size: &'static str,
    pub font_family: &'static str,
    pub theme: &'static str,
    pub light: &'static str,
    pub dark: &'static str,
    pub language: &'static str,
    pub test_connection: &'static str,
    pub cancel: &'static str,
    pub welcome: &'static str,
    pub welcome_body: &'static str,
    pub get_started: &'static str,
    pub skip: &'static str,
    pub settings_saved: &'static str,
    pub config_valid: &'static str,
    pub config_invalid: &'static str,
    pub dismiss: &'static str,
    pub collapse_all: &'static str,
    pub close_all: &'static str,
    pub clear_config: &'static str,
    pub recent_workspaces: &'static str,
    pub remove: &'static str,
}

static EN_US: Strings = Strings {
    app_title: "Cowork",
    files: "Files",
    sessions: "Sessions",
    skills: "Skills",
    settings: "Settings",
    refresh: "Refresh",
    new_file: "New file",
    new_folder: "New folder",
    rename: "Rename",
    delete: "Delete",
    name_hint: "name",
    new_chat: "New chat",
    no_sessions: "No chat sessions yet",
    search_skills: "Search skills",
    all_categories: "All",
    skill_packs: "Skill packs",
    install_pack: "Install pack",
    pack_path_hint: "path to a skill pack folder",
    uninstall: "Uninstall",
    create_skill: "Create skill",
    description: "Description",
    content: "Content",
    save: "Save",
    save_all: "Save all",
    close: "Close",
    no_open_files: "Open a file from the explorer to start editing",
    chat: "Chat",
    you: "You",
    assistant: "Assistant",
    message_hint: "Ask the assistant...",
    send: "Send",
    attach_active_file: "Attach active file",
    empty_chat: "Start a conversation with the assistant",
    provider: "Provider",
    api_key: "API key",
    endpoint: "Endpoint",
    workspace: "Workspace",
    browse: "Browse",
    font_size: "Font size",
    font_family: "Font family",
    theme: "Theme",
    light: "Light",
    dark: "Dark",
    language: "Language",
    test_connection: "Test connection",
    cancel: "Cancel",
    welcome: "Welcome to Cowork",
    welcome_body: "Edit code, chat with the assistant and manage skills in one window.",
    get_started: "Get started",
    skip: "Skip",
    settings_saved: "Settings saved",
    config_valid: "API configuration is valid",
    config_invalid: "API configuration is invalid",
    dismiss: "Dismiss",
    collapse_all: "Collapse all",
    close_all: "Close all",
    clear_config: "Clear API config",
    recent_workspaces: "Recent workspaces",
    remove: "Remove",
};

static ZH_CN: Strings = Strings {
    app_title: "Cowork",
    files: "文件",
    sessions: "会话",
    skills: "技能",
    settings: "设置",
    refresh: "刷新",
    new_file: "新建文件",
    new_folder: "新建文件夹",
    rename: "重命名",
    delete: "删除",
    name_hint: "名称",
    new_chat: "新建对话",
    no_sessions: "暂无会话",
    search_skills: "搜索技能",
    all_categories: "全部",
    skill_packs: "技能包",
    install_pack: "安装技能包",
    pack_path_hint: "技能包文件夹路径",
    uninstall: "卸载",
    create_skill: "创建技能",
    description: "描述",
    content: "内容",
    save: "保存",
    save_all: "全部保存",
    close: "关闭",
    no_open_files: "从文件浏览器打开文件开始编辑",
    chat: "对话",
    you: "你",
    assistant: "助手",
    message_hint: "向助手提问...",
    send: "发送",
    attach_active_file: "附加当前文件",
    empty_chat: "开始与AI助手对话",
    provider: "服务商",
    api_key: "API 密钥",
    endpoint: "接口地址",
    workspace: "工作区",
    browse: "浏览",
    font_size: "字体大小",
    font_family: "字体",
    theme: "主题",
    light: "浅色",
    dark: "深色",
    language: "语言",
    test_connection: "测试连接",
    cancel: "取消",
    welcome: "欢迎使用 Cowork",
    welcome_body: "专业的AI辅助编程环境，提升您的开发效率",
    get_started: "开始使用",
    skip: "跳过",
    settings_saved: "设置已保存",
    config_valid: "API 配置有效",
    config_invalid: "API 配置无效",
    dismiss: "忽略",
    collapse_all: "全部折叠",
    close_all: "全部关闭",
    clear_config: "清除 API 配置",
    recent_workspaces: "最近的工作区",
    remove: "移除",
};

pub fn strings(language: Language) -> &'static Strings {
    match language {
        Language::EnUs => &EN_US,
        Language::ZhCn => &ZH_CN,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tables_follow_language() {
        assert_eq!(strings(Language::EnUs).settings, "Settings");
        assert_eq!(strings(Language::ZhCn).settings, "设置");
        assert_eq!(strings(Language::default()).files, "文件");
    }
}
