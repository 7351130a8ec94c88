use eframe::egui::{self, RichText, ScrollArea};
use std::collections::BTreeMap;

use super::View;
use crate::model::{FileTreeNode, NewSkill, Skill, SkillCategory};
use crate::store::filesystem::FileSystemState;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SidebarTab {
    #[default]
    Files,
    Sessions,
    Skills,
}

#[derive(Debug, Default)]
struct SkillDraft {
    name: String,
    description: String,
    content: String,
}

#[derive(Debug, Default)]
pub struct Sidebar {
    tab: SidebarTab,
    new_name: String,
    rename_to: String,
    search: String,
    category: Option<SkillCategory>,
    pack_path: String,
    draft: SkillDraft,
}

fn find_node<'a>(nodes: &'a [FileTreeNode], key: &str) -> Option<&'a FileTreeNode> {
    nodes.iter().find_map(|node| {
        if node.key == key {
            Some(node)
        } else {
            find_node(node.children.as_deref().unwrap_or_default(), key)
        }
    })
}

impl Sidebar {
    pub fn show(&mut self, ui: &mut egui::Ui, view: &View<'_>) {
        ui.horizontal(|ui| {
            ui.selectable_value(&mut self.tab, SidebarTab::Files, view.text.files);
            ui.selectable_value(&mut self.tab, SidebarTab::Sessions, view.text.sessions);
            ui.selectable_value(&mut self.tab, SidebarTab::Skills, view.text.skills);
        });
        ui.separator();

        match self.tab {
            SidebarTab::Files => self.files(ui, view),
            SidebarTab::Sessions => self.sessions(ui, view),
            SidebarTab::Skills => self.skills(ui, view),
        }
    }

    fn files(&mut self, ui: &mut egui::Ui, view: &View<'_>) {
        let state = view.stores.files.state();
        let text = view.text;

        ui.horizontal(|ui| {
            if ui.button(text.refresh).clicked() {
                let files = view.stores.files.clone();
                view.dispatcher
                    .spawn("refresh file tree", async move { files.refresh_tree().await });
            }
            if ui.button(text.collapse_all).clicked() {
                view.stores.files.set_expanded_keys(Vec::new());
            }
            if state.is_loading {
                ui.spinner();
            }
        });

        // New entries go into the selected folder, else the root.
        let parent = state
            .selected_key
            .as_deref()
            .and_then(|key| find_node(&state.file_tree, key))
            .filter(|node| node.is_folder())
            .map(|node| node.path.clone())
            .or_else(|| state.root_path.clone());

        ui.add(egui::TextEdit::singleline(&mut self.new_name).hint_text(text.name_hint));
        ui.horizontal(|ui| {
            let ready = parent.is_some() && !self.new_name.trim().is_empty();
            if ui.add_enabled(ready, egui::Button::new(text.new_file)).clicked() {
                if let Some(parent) = parent.clone() {
                    let name = self.new_name.trim().to_string();
                    let files = view.stores.files.clone();
                    view.dispatcher.spawn("create file", async move {
                        files.create_file(&parent, &name).await.map(|_| ())
                    });
                    self.new_name.clear();
                }
            }
            if ui.add_enabled(ready, egui::Button::new(text.new_folder)).clicked() {
                if let Some(parent) = parent.clone() {
                    let name = self.new_name.trim().to_string();
                    let files = view.stores.files.clone();
                    view.dispatcher.spawn("create folder", async move {
                        files.create_folder(&parent, &name).await.map(|_| ())
                    });
                    self.new_name.clear();
                }
            }
        });

        if let Some(selected) = state.selected_key.clone() {
            ui.horizontal(|ui| {
                ui.add(
                    egui::TextEdit::singleline(&mut self.rename_to)
                        .hint_text(text.name_hint)
                        .desired_width(120.0),
                );
                let can_rename = !self.rename_to.trim().is_empty();
                if ui.add_enabled(can_rename, egui::Button::new(text.rename)).clicked() {
                    let name = self.rename_to.trim().to_string();
                    let files = view.stores.files.clone();
                    let old_path = selected.clone();
                    view.dispatcher.spawn("rename file", async move {
                        files.rename_file(&old_path, &name).await.map(|_| ())
                    });
                    self.rename_to.clear();
                }
                if ui.button(RichText::new(text.delete).color(view.theme.danger)).clicked() {
                    let files = view.stores.files.clone();
                    let path = selected.clone();
                    view.dispatcher
                        .spawn("delete file", async move { files.delete_file(&path).await });
                }
            });
        }

        ui.separator();
        ScrollArea::vertical().id_salt("file_tree").show(ui, |ui| {
            for node in &state.file_tree {
                tree_node(ui, view, &state, node);
            }
        });
    }

    fn sessions(&mut self, ui: &mut egui::Ui, view: &View<'_>) {
        let state = view.stores.chat.state();
        let text = view.text;

        if ui.button(text.new_chat).clicked() {
            let chat = view.stores.chat.clone();
            let name = format!("{} {}", text.new_chat, state.sessions.len() + 1);
            view.dispatcher.spawn("create session", async move {
                chat.create_session(&name).await.map(|_| ())
            });
        }
        ui.separator();

        if state.sessions.is_empty() {
            ui.label(RichText::new(text.no_sessions).color(view.theme.text_muted));
            return;
        }

        ScrollArea::vertical().id_salt("session_list").show(ui, |ui| {
            for session in &state.sessions {
                ui.horizontal(|ui| {
                    let current = state.current_session_id.as_deref() == Some(session.id.as_str());
                    if ui.selectable_label(current, &session.name).clicked() {
                        view.stores.chat.switch_session(&session.id);
                    }
                    if ui.small_button("✕").on_hover_text(text.delete).clicked() {
                        let chat = view.stores.chat.clone();
                        let session_id = session.id.clone();
                        view.dispatcher.spawn("delete session", async move {
                            chat.delete_session(&session_id).await
                        });
                    }
                });
            }
        });
    }

    fn skills(&mut self, ui: &mut egui::Ui, view: &View<'_>) {
        let text = view.text;
        let skills_store = &view.stores.skills;

        let search = ui.add(egui::TextEdit::singleline(&mut self.search).hint_text(text.search_skills));
        if search.changed() {
            skills_store.search_skills(self.search.clone());
        }

        egui::ComboBox::from_id_salt("skill_category")
            .selected_text(self.category.map_or(text.all_categories, SkillCategory::label))
            .show_ui(ui, |ui| {
                ui.selectable_value(&mut self.category, None, text.all_categories);
                for category in SkillCategory::ALL {
                    ui.selectable_value(&mut self.category, Some(category), category.label());
                }
            });

        let state = skills_store.state();
        let visible: Vec<Skill> = match self.category {
            Some(category) => skills_store
                .skills_by_category(category)
                .into_iter()
                .filter(|skill| skill.matches_keyword(&state.filter_keyword))
                .collect(),
            None => skills_store.filtered_skills(),
        };

        ScrollArea::vertical().id_salt("skills_list").max_height(ui.available_height() * 0.5).show(ui, |ui| {
            for skill in &visible {
                view.theme.card_frame().show(ui, |ui| {
                    ui.set_width(ui.available_width());
                    ui.horizontal(|ui| {
                        ui.strong(&skill.name);
                        ui.label(RichText::new(skill.category.label()).small().color(view.theme.text_muted));
                        if skill.category == SkillCategory::UserCreated && ui.small_button("✕").clicked() {
                            let skills = skills_store.clone();
                            let skill_id = skill.id.clone();
                            view.dispatcher.spawn("delete skill", async move {
                                skills.delete_user_skill(&skill_id).await
                            });
                        }
                    });
                    ui.label(RichText::new(&skill.description).color(view.theme.text_muted));
                });
            }
        });

        ui.separator();
        ui.strong(text.skill_packs);
        for pack in &state.skill_packs {
            ui.horizontal(|ui| {
                ui.label(format!("{} {}", pack.name, pack.version));
                if ui.small_button(text.uninstall).clicked() {
                    let skills = skills_store.clone();
                    let pack_id = pack.id.clone();
                    view.dispatcher.spawn("uninstall skill pack", async move {
                        skills.uninstall_skill_pack(&pack_id).await
                    });
                }
            });
        }
        ui.horizontal(|ui| {
            ui.add(
                egui::TextEdit::singleline(&mut self.pack_path)
                    .hint_text(text.pack_path_hint)
                    .desired_width(160.0),
            );
            let ready = !self.pack_path.trim().is_empty();
            if ui.add_enabled(ready, egui::Button::new(text.install_pack)).clicked() {
                let skills = skills_store.clone();
                let pack_path = self.pack_path.trim().to_string();
                view.dispatcher.spawn("install skill pack", async move {
                    skills.install_skill_pack(&pack_path).await.map(|_| ())
                });
                self.pack_path.clear();
            }
        });

        egui::CollapsingHeader::new(text.create_skill)
            .id_salt("create_skill")
            .show(ui, |ui| {
                ui.add(egui::TextEdit::singleline(&mut self.draft.name).hint_text(text.name_hint));
                ui.add(egui::TextEdit::singleline(&mut self.draft.description).hint_text(text.description));
                ui.add(
                    egui::TextEdit::multiline(&mut self.draft.content)
                        .hint_text(text.content)
                        .desired_rows(4),
                );
                let ready = !self.draft.name.trim().is_empty();
                if ui.add_enabled(ready, egui::Button::new(text.create_skill)).clicked() {
                    let draft = std::mem::take(&mut self.draft);
                    let skill = NewSkill {
                        name: draft.name.trim().to_string(),
                        description: draft.description,
                        category: SkillCategory::UserCreated,
                        path: String::new(),
                        content: draft.content,
                        metadata: BTreeMap::new(),
                    };
                    let skills = skills_store.clone();
                    view.dispatcher.spawn("create skill", async move {
                        skills.create_skill(skill).await.map(|_| ())
                    });
                }
            });
    }
}

fn tree_node(ui: &mut egui::Ui, view: &View<'_>, state: &FileSystemState, node: &FileTreeNode) {
    let selected = state.selected_key.as_deref() == Some(node.key.as_str());
    if node.is_folder() {
        let expanded = state.expanded_keys.contains(&node.key);
        let marker = if expanded { "▾" } else { "▸" };
        if ui
            .selectable_label(selected, format!("{marker} {}", node.title))
            .clicked()
        {
            view.stores.files.toggle_expanded(&node.key);
            view.stores.files.set_selected_key(Some(node.key.clone()));
        }
        if expanded {
            ui.indent(&node.key, |ui| {
                for child in node.children.as_deref().unwrap_or_default() {
                    tree_node(ui, view, state, child);
                }
            });
        }
    } else if ui.selectable_label(selected, &node.title).clicked() {
        view.stores.files.set_selected_key(Some(node.key.clone()));
        let editor = view.stores.editor.clone();
        let path = node.path.clone();
        view.dispatcher
            .spawn("open file", async move { editor.open_file(&path).await.map(|_| ()) });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nested_nodes_are_found_by_key() {
        let tree = vec![FileTreeNode::folder(
            "/ws/src",
            vec![FileTreeNode::folder("/ws/src/ui", vec![FileTreeNode::file("/ws/src/ui/mod.rs")])],
        )];
        assert_eq!(find_node(&tree, "/ws/src/ui/mod.rs").map(|node| node.title.as_str()), Some("mod.rs"));
        assert!(find_node(&tree, "/ws/other").is_none());
    }
}
