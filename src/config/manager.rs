//! 設定管理を行うモジュール

use std::path::PathBuf;
use std::sync::Arc;

use super::{
    CheckerSettings,
    ConfigError,
    MatcherError,
    RuleSet,
    loader,
};

/// 設定と、そこからコンパイルしたルールのスナップショットを保持する
#[derive(Default, Debug, Clone)]
pub struct ConfigManager {
    /// 現在の設定
    current_settings: CheckerSettings,

    /// `current_settings` からコンパイルしたルール
    rules: Arc<RuleSet>,

    /// ワークスペースのルートパス
    workspace_root: Option<PathBuf>,

    /// クライアントから最後に受け取った設定。設定ファイルより優先される
    client_settings: Option<CheckerSettings>,
}

impl ConfigManager {
    /// 新しい設定マネージャーを作成
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// 設定を読み込む
    ///
    /// # Arguments
    /// * `workspace_root` - ワークスペースのルートパス
    ///
    /// # Returns
    /// - `Ok(errors)`: 読み込み成功。`errors` はスキップされたルール
    /// - `Err(ConfigError)`: エラー（現在の設定は変更されない）
    ///
    /// # Errors
    /// - ファイル読み込みエラー
    /// - JSON パースエラー
    /// - バリデーションエラー
    pub fn load_settings(
        &mut self,
        workspace_root: Option<PathBuf>,
    ) -> Result<Vec<MatcherError>, ConfigError> {
        tracing::debug!("Loading settings for workspace: {:?}", workspace_root);

        let settings = if let Some(root) = &workspace_root {
            loader::load_from_workspace(root)?.map_or_else(CheckerSettings::default, |ws| {
                tracing::debug!("Loaded workspace settings: {:?}", ws);
                ws
            })
        } else {
            CheckerSettings::default()
        };

        let errors = self.apply(settings)?;
        self.workspace_root = workspace_root;

        Ok(errors)
    }

    /// 設定を更新する（`initializationOptions` / `did_change_configuration` 用）
    ///
    /// # Errors
    /// - バリデーションエラー
    pub fn update_settings(
        &mut self,
        new_settings: CheckerSettings,
    ) -> Result<Vec<MatcherError>, ConfigError> {
        tracing::debug!("Updating settings...");
        let errors = self.apply(new_settings.clone())?;
        self.client_settings = Some(new_settings);
        Ok(errors)
    }

    /// ワークスペースの設定ファイルを読み直す（ファイル変更時）
    ///
    /// クライアントから設定を受け取っている場合、設定ファイルは検証だけ行い、
    /// クライアントの設定を適用し直す。
    ///
    /// # Errors
    /// - ファイル読み込みエラー / パースエラー / バリデーションエラー
    pub fn reload_workspace_settings(&mut self) -> Result<Vec<MatcherError>, ConfigError> {
        let root = self.workspace_root.clone();
        let Some(client_settings) = self.client_settings.clone() else {
            return self.load_settings(root);
        };

        let file_settings =
            root.as_deref().map(loader::load_from_workspace).transpose()?.flatten();
        if let Some(file_settings) = file_settings {
            file_settings.validate().map_err(ConfigError::ValidationErrors)?;
        }
        tracing::debug!("Keeping client settings over the workspace config file");
        self.apply(client_settings)
    }

    /// 検証してからルールをコンパイルし、設定とルールを置き換える
    fn apply(&mut self, settings: CheckerSettings) -> Result<Vec<MatcherError>, ConfigError> {
        settings.validate().map_err(ConfigError::ValidationErrors)?;

        let (rules, errors) = RuleSet::compile(&settings);
        tracing::debug!(
            rules = rules.rules().len(),
            skipped = errors.len(),
            "Settings applied successfully"
        );

        self.current_settings = settings;
        self.rules = Arc::new(rules);

        Ok(errors)
    }

    /// 現在の設定を取得
    #[must_use]
    pub const fn get_settings(&self) -> &CheckerSettings {
        &self.current_settings
    }

    /// チェックに渡すルールのスナップショットを取得
    #[must_use]
    pub fn rules(&self) -> Arc<RuleSet> {
        Arc::clone(&self.rules)
    }

    /// ワークスペースルートを取得
    #[must_use]
    pub const fn workspace_root(&self) -> Option<&PathBuf> {
        self.workspace_root.as_ref()
    }
}
