use anyhow::{Context, Result};
use git2::{Repository, Signature};
use log::{debug, info, warn};
use std::path::Path;

pub const COMMIT_MESSAGE: &str = "version";
pub const TAG_MESSAGE: &str = "Version bumped with xcbump";

pub struct GitTracker {
    pub repository: Repository,
}

impl GitTracker {
    /// Opens the repository rooted at the given path
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let repository = Repository::open(path)
            .with_context(|| format!("Failed to open git repository at {:?}", path))?;

        debug!("Opened repository at {:?}", repository.path());

        Ok(GitTracker { repository })
    }

    /// Gets the repository signature from local git config
    fn get_signature(&self) -> Result<Signature<'_>> {
        self.repository.signature()
            .context("Failed to get git signature. Please configure user.name and user.email in git config")
    }

    /// Stages all new, modified and deleted files in the repository
    pub fn stage_all(&self) -> Result<()> {
        let mut index = self.repository.index()?;

        index.add_all(["*"].iter(), git2::IndexAddOption::DEFAULT, None)?;
        index.update_all(["*"].iter(), None)?;
        index.write()?;

        debug!("Staged all changes");
        Ok(())
    }

    /// Commits the staged index on top of HEAD, or as the root commit of an unborn branch
    pub fn create_commit(&self, message: &str) -> Result<git2::Oid> {
        info!("Committing version bump: {}", message);

        let tree_id = self.repository.index()?.write_tree()?;
        let tree = self.repository.find_tree(tree_id)?;
        let sig = self.get_signature()?;

        let parent_commit = match self.repository.head() {
            Ok(head) => Some(head.peel_to_commit()?),
            Err(_) => {
                warn!("HEAD is unborn, committing without a parent");
                None
            }
        };

        let parents: Vec<&git2::Commit> = parent_commit.iter().collect();
        let commit_id = self
            .repository
            .commit(Some("HEAD"), &sig, &sig, message, &tree, &parents)?;

        info!("Committed {}", commit_id);
        Ok(commit_id)
    }

    /// Creates an annotated tag for the given commit
    pub fn create_tag(&self, tag_name: &str, message: &str, commit_id: git2::Oid) -> Result<git2::Oid> {
        debug!("Tagging {} as {}", commit_id, tag_name);

        let sig = self.get_signature()?;
        let commit_obj = self.repository
            .find_object(commit_id, Some(git2::ObjectType::Commit))?;

        let tag_id = self.repository.tag(
            tag_name,
            &commit_obj,
            &sig,
            message,
            false,
        )?;

        info!("Tagged {} as {}", commit_id, tag_name);
        Ok(tag_id)
    }

    /// Stages everything, commits it and tags the new commit
    pub fn commit_and_tag(&self, tag_name: &str) -> Result<git2::Oid> {
        self.stage_all()?;
        let commit_id = self.create_commit(COMMIT_MESSAGE)?;
        self.create_tag(tag_name, TAG_MESSAGE, commit_id)?;
        Ok(commit_id)
    }
}
